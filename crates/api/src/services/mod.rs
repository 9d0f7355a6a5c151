//! Business logic and external collaborators.
//!
//! # Services
//!
//! - `identity` - Accounts, ID tokens and claims at the identity provider
//! - `assets` - Image hosting (Cloudinary or a local directory)
//! - `embeddings` - Text embeddings for product search
//! - `email` - Verification codes and listing confirmations over SMTP
//! - `orders` - Cart-to-order placement and order lifecycle
//! - `otp` - Email and phone verification codes
//! - `products` - Vendor catalog writes
//! - `chat_hub` - Fan-out between chat sockets

pub mod assets;
pub mod chat_hub;
pub mod email;
pub mod embeddings;
pub mod identity;
pub mod orders;
pub mod otp;
pub mod products;
