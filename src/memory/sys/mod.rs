// Fri Oct 16 2026 - Alex

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
pub use linux::Process;
#[cfg(target_os = "macos")]
pub use macos::Process;
