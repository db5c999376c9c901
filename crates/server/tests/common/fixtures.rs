//! Test fixtures for frame directories.

use std::path::Path;

/// Write `frame_<n>.txt` files with the given payloads into `dir`.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn write_frames(dir: &Path, frames: &[(u32, &str)]) {
    for (n, data) in frames {
        std::fs::write(dir.join(format!("frame_{n}.txt")), data).expect("Failed to write frame");
    }
}

/// Deterministic multi-line payload resembling a radar sweep dump.
#[allow(dead_code)]
pub fn sweep_payload(frame: u32, lines: usize) -> String {
    (0..lines)
        .map(|i| format!("{frame},{i},{}", (frame as usize * 31 + i * 7) % 256))
        .collect::<Vec<_>>()
        .join("\n")
}
