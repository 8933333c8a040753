//! Vitrine - real-time glTF scene viewer
//!
//! Loads a glTF asset on a background thread, binds every mesh to one shared physical
//! material, and exposes that material, the spot light and the camera through a live
//! control panel. The asset's embedded camera drives the view once it arrives.

mod app;
mod assets;
mod config;
mod params;
mod render;
mod scene;
mod ui;
mod viewer;

use std::process::ExitCode;

fn main() -> ExitCode {
    app::run()
}
