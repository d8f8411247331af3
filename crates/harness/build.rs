fn main() {
    // Only run linker script setup for hardware builds
    #[cfg(feature = "hardware")]
    {
        use std::env;
        use std::fs;
        use std::path::PathBuf;

        // Put `memory.x` in our output directory and ensure it's on the linker search path.
        let Some(out) = env::var_os("OUT_DIR").map(PathBuf::from) else {
            println!("cargo:warning=OUT_DIR not set, skipping memory.x");
            return;
        };
        if let Err(err) = fs::write(out.join("memory.x"), include_bytes!("memory.x")) {
            println!("cargo:warning=failed to write memory.x: {err}");
            return;
        }

        println!("cargo:rustc-link-search={}", out.display());
        println!("cargo:rerun-if-changed=memory.x");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
