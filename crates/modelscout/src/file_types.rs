//! Model file type labels and badge colours

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTypeInfo {
    pub name: &'static str,
    /// Badge colour as a `#rrggbb` hex code
    pub color: &'static str,
}

const OTHER: FileTypeInfo = FileTypeInfo {
    name: "other",
    color: "#6c757d",
};

const FILE_TYPES: &[(&str, FileTypeInfo)] = &[
    (
        "ckpt",
        FileTypeInfo {
            name: "Checkpoint",
            color: "#4a90e2",
        },
    ),
    (
        "safetensors",
        FileTypeInfo {
            name: "SafeTensors",
            color: "#28a745",
        },
    ),
    (
        "sft",
        FileTypeInfo {
            name: "SafeTensors",
            color: "#28a745",
        },
    ),
    (
        "pt",
        FileTypeInfo {
            name: "LoRA/TI",
            color: "#dc3545",
        },
    ),
    (
        "bin",
        FileTypeInfo {
            name: "Binary",
            color: "#6c757d",
        },
    ),
    (
        "yaml",
        FileTypeInfo {
            name: "Config",
            color: "#ffc107",
        },
    ),
    (
        "gguf",
        FileTypeInfo {
            name: "Stable Diffusion Model",
            color: "#4169E1",
        },
    ),
    (
        "vae",
        FileTypeInfo {
            name: "VAE",
            color: "#17a2b8",
        },
    ),
];

/// Look up the type label for a filename by its extension.
///
/// The extension is everything after the last `.`, lowercased. A name without
/// a dot is treated as its own extension, which never matches the table.
pub fn get_file_type_info(filename: &str) -> FileTypeInfo {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(filename)
        .to_lowercase();

    FILE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, info)| *info)
        .unwrap_or(OTHER)
}

impl FileTypeInfo {
    /// Parse the hex colour into RGB components
    pub fn rgb(&self) -> (u8, u8, u8) {
        let hex = self.color.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .unwrap_or(0x80)
        };
        (channel(0..2), channel(2..4), channel(4..6))
    }
}
