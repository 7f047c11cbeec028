#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(error) = mip_orbit::run() {
        log::error!("{error}");
        eprintln!("mip-orbit: {error}");
        std::process::exit(1);
    }
}

// The web build starts from `mip_orbit::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
