//! Domain models for the marketplace API.
//!
//! Row types derive `sqlx::FromRow` and `Serialize`; request bodies derive
//! `Deserialize`. JSON uses `snake_case` field names throughout.

pub mod cart;
pub mod category;
pub mod chat;
pub mod listing;
pub mod notification;
pub mod order;
pub mod otp;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{AddToCart, CartItem, CartLineSnapshot, MAX_LINE_QUANTITY, RemoveFromCart};
pub use category::{Category, NewCategory};
pub use chat::{ChatMessage, ChatSummary, StartChat};
pub use listing::{Page, Paginated, SortDirection};
pub use notification::Notification;
pub use order::{Order, OrderDetail, OrderDraft, OrderSort, OrderView};
pub use otp::{OtpRecord, OtpRejection};
pub use product::{
    NewProduct, ProductDetail, ProductFilter, ProductImage, ProductRow, ProductSort,
    ProductSummary, SearchHit, TrendingProduct,
};
pub use review::{NewReview, Review};
pub use session::{CurrentUser, Verified, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, UserProfile};
