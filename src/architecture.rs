//! Target CPU architecture and build mode identifiers.

crate::define_id_enum! {
    /// CPU architecture a function is packaged for
    Architecture {
        X86_64 => "x86_64" | "amd64" | "x64",
        Arm64 => "arm64" | "aarch64",
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::X86_64
    }
}

impl Architecture {
    /// Architecture name as understood by the Go toolchain (`GOARCH`).
    pub fn goarch(&self) -> &str {
        match self {
            Architecture::X86_64 => "amd64",
            Architecture::Arm64 => "arm64",
            Architecture::Custom(name) => name,
        }
    }
}

crate::define_id_enum! {
    /// Build flavour requested by the caller
    BuildMode {
        Debug => "debug",
        Release => "release",
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode::Release
    }
}
