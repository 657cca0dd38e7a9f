//! Wire protocol for the step service.
//!
//! Wire format:
//! ```text
//! [payload:N]  (one UDP datagram, UTF-8 text, no header, no framing)
//! ```
//! The only recognized command is the literal `STEP`.  Payloads are trimmed
//! of surrounding whitespace before comparison, and the comparison is
//! case-sensitive: `"STEP\n"` counts as a step, `"step"` does not.  No
//! acknowledgment is ever sent back; the protocol is strictly fire-and-forget.
//!
//! # Why so minimal? (for beginners)
//!
//! The sender is a phone app emitting one packet per physical step.  At a
//! human walking pace that is at most a few packets per second, so there is
//! nothing to batch, sequence, or compress.  UDP's lack of delivery
//! guarantees is acceptable: a lost packet means one missed step, which the
//! walker never notices.

/// The single recognized command payload.
pub const STEP_COMMAND: &str = "STEP";

/// Default UDP port the listener binds when no configuration is present.
pub const DEFAULT_PORT: u16 = 9000;

/// Default receive buffer size in bytes.  Step datagrams are a handful of
/// bytes, so this is generous headroom rather than a real limit.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Classification of one received datagram payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// The literal `STEP` command (after whitespace trimming).
    Step,
    /// Valid UTF-8 text that is not a recognized command.
    Unrecognized,
    /// Bytes that are not valid UTF-8.
    NotText,
}

/// Classifies a raw datagram payload.
///
/// Never fails: anything that is not a step command is reported as
/// [`Payload::Unrecognized`] or [`Payload::NotText`] so the receive loop can
/// ignore it without treating the datagram as an error.
///
/// # Examples
///
/// ```rust
/// use stride_core::protocol::{classify_datagram, Payload};
///
/// assert_eq!(classify_datagram(b"STEP"), Payload::Step);
/// assert_eq!(classify_datagram(b"  STEP\n"), Payload::Step);
/// assert_eq!(classify_datagram(b"HELLO"), Payload::Unrecognized);
/// ```
pub fn classify_datagram(datagram: &[u8]) -> Payload {
    match std::str::from_utf8(datagram) {
        Ok(text) if text.trim() == STEP_COMMAND => Payload::Step,
        Ok(_) => Payload::Unrecognized,
        Err(_) => Payload::NotText,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
