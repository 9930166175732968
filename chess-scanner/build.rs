fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(feature = "resolve_opencv_with_vcpkg")]
    resolve_opencv_with_vcpkg();
}

/// Link against the OpenCV of a vcpkg installation if there is one. Without `VCPKG_ROOT` the
/// `opencv` crate finds the system installation on its own.
#[cfg(feature = "resolve_opencv_with_vcpkg")]
fn resolve_opencv_with_vcpkg() {
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");

    if let Err(e) = vcpkg::find_package("opencv4")
        && std::env::var_os("VCPKG_ROOT").is_some()
    {
        println!("cargo:warning=OpenCV not found through vcpkg: {e}");
    }
}
