//! pie-accel: accelerator strings and the key events they match.
//!
//! - `Accelerator`: a parsed accelerator such as `"Control+Shift+P"`, with
//!   four modifier flags, an optional primary key, and the normalized key set
//!   used for equality and hold-release bookkeeping.
//! - `KeyEvent`: a DOM-style key event (`key`, `code`, modifier flags).
//! - `AcceleratorCache`: bounded memo so each accelerator string is parsed once.
//! - `AcceleratorRegistry`: id → accelerator bindings with conflict evaluation.
//!
//! Parsing never fails loudly. Unknown tokens become the primary key, and a
//! string with no primary key matches any key with the right modifiers.

mod modifiers;
pub use modifiers::{Modifier, Modifiers};

mod spec;
pub use spec::normalize_key_name;

mod event;
pub use event::KeyEvent;

mod accelerator;
pub use accelerator::Accelerator;

mod cache;
pub use cache::AcceleratorCache;

mod registry;
pub use registry::{
    AcceleratorRegistry, Conflict, ConflictCode, RegisteredAccelerator, RegistrationStatus,
};
