// Wire models for the commerce backend. The backend speaks
// PascalCase JSON with extensible `xp` metadata bags on most entities.
pub mod line_item;
pub mod order;
pub mod payment;
pub mod subscription;

pub use line_item::{LineItem, LineItemXp, ListPage};
pub use order::{Order, OrderPatch, OrderStatus, OrderSubscriptionXp, OrderXp};
pub use payment::{Payment, PaymentTransaction, PaymentType};
pub use subscription::{Subscription, SubscriptionInterval, SubscriptionXp};
