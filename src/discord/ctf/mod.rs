// Discord side of the CTF lifecycle: the platform adapter, message rendering
// and gateway event routing.

pub mod formatter;
pub mod platform;
pub mod router;

pub use platform::DiscordPlatform;
