//! Shared UI icons.

use console::Emoji;

// Status
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "[..]");

// Card error kinds
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static PLUG: Emoji<'_, '_> = Emoji("🔌 ", "[NET]");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static RETRY: Emoji<'_, '_> = Emoji("🔄 ", "[R]");

// Board structure
pub static COLUMN: Emoji<'_, '_> = Emoji("📋 ", "##");
pub static POST: Emoji<'_, '_> = Emoji("📝 ", "-");
