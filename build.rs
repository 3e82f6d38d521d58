use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

/// Windows builds of ffmpeg-sys-next rarely find FFmpeg on their own. Point
/// the user at a vcpkg install when `FFMPEG_DIR` is missing.
fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    for hint in windows_hints() {
        println!("cargo:warning={hint}");
    }
}

fn windows_hints() -> Vec<String> {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        return vec![
            "FFMPEG_DIR is not set. Install FFmpeg with vcpkg and set VCPKG_ROOT and FFMPEG_DIR before building framesplit."
                .to_string(),
        ];
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if !install.exists() {
        return vec![format!(
            "VCPKG_ROOT is set but {} does not contain an FFmpeg install.",
            install.display()
        )];
    }

    let mut hints = vec![format!(
        "Found vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} so ffmpeg-sys-next uses it.",
        install.display()
    )];
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        hints.push("Set VCPKGRS_DYNAMIC=1 if that FFmpeg is a dynamic build.".to_string());
    }
    hints
}
