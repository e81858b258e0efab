//! Messaging gateway interface for the time-clock assistant.
//!
//! - **Events** (`events`) - inbound text and postback events, routed to
//!   per-type handlers by an [`events::EventDispatcher`]
//! - **Messenger** (`messenger`) - outbound reply/push/buttons delivery over
//!   HTTP, or a tracing-only stand-in when no endpoint is configured
//!
//! ```text
//! Gateway callback → EventDispatcher → Handlers → ConversationService
//!                                                        ↓
//!                          Messenger (reply / push / buttons)
//! ```
//!
//! Postbacks carry the label of the pressed button and are handed to the
//! conversation as if the user had typed that label.

pub mod events;
pub mod messenger;
