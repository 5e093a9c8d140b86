//! # Order types
//!
//! Wire types of the GBDX ordering API and the aggregate produced by ordering
//! many acquisitions at once.
//!
//! - [`Acquisition`] - one ordered acquisition and its delivery state
//! - [`Order`] - the response to a single order request (at most
//!   [`MAX_ORDER_SIZE`] acquisitions)
//! - [`Orders`] - every order of a bulk run folded together

use chunkflow::Merge;
use serde::{Deserialize, Serialize};

/// Largest number of acquisition ids the ordering endpoint accepts in one
/// request.
pub const MAX_ORDER_SIZE: usize = 100;

/// A single acquisition within an order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acquisition {
    pub acquisition_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Response to one order request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    #[serde(default)]
    pub acquisitions: Vec<Acquisition>,
}

/// Aggregation of many [`Order`]s.
///
/// The ordering API caps requests at [`MAX_ORDER_SIZE`] acquisitions, which
/// is inconvenient when placing and tracking bulk orders. `Orders` collects
/// every order id and acquisition of a bulk run into one value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orders {
    #[serde(rename = "order_ids")]
    pub ids: Vec<String>,
    pub acquisitions: Vec<Acquisition>,
}

impl Orders {
    pub fn push(&mut self, order: Order) {
        self.ids.push(order.order_id);
        self.acquisitions.extend(order.acquisitions);
    }
}

impl Merge<Order> for Orders {
    fn merge(&mut self, order: Order) {
        self.push(order);
    }
}
