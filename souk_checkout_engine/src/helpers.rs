use rand::Rng;
use souk_common::Fils;

use crate::db_types::{OrderNumber, PaymentId};

/// UAE VAT, applied to order subtotals and rounded half-up at the fils.
pub const VAT_RATE_PERCENT: i64 = 5;

/// Carts expire this long after creation. Expiry is advisory: it is checked when a cart is read,
/// not swept in the background.
pub const CART_TTL_DAYS: i64 = 2;

const ORDER_SUFFIX_LEN: usize = 8;
const PAYMENT_SUFFIX_LEN: usize = 12;
const REFUND_SUFFIX_LEN: usize = 10;

/// Flat delivery fee per emirate, in fils. Regions outside the table get the default.
const DELIVERY_FEES: [(&str, i64); 7] = [
    ("DUBAI", 1_500),
    ("ABU_DHABI", 2_000),
    ("SHARJAH", 1_800),
    ("AJMAN", 2_000),
    ("UMM_AL_QUWAIN", 2_500),
    ("RAS_AL_KHAIMAH", 2_500),
    ("FUJAIRAH", 3_000),
];
const DEFAULT_DELIVERY_FEE: i64 = 2_000;

pub fn vat_on(amount: Fils) -> Fils {
    amount.percentage(VAT_RATE_PERCENT)
}

/// Looks up the delivery fee for an emirate. Matching is case-insensitive and tolerates spaces in
/// place of underscores ("Abu Dhabi" and "ABU_DHABI" are the same region).
pub fn delivery_fee(emirate: &str) -> Fils {
    let key = emirate.trim().to_ascii_uppercase().replace(' ', "_");
    let fee = DELIVERY_FEES
        .iter()
        .find_map(|(name, fee)| (*name == key).then_some(*fee))
        .unwrap_or(DEFAULT_DELIVERY_FEE);
    Fils::from(fee)
}

pub fn new_order_number() -> OrderNumber {
    OrderNumber(format!("ORD-{}", random_suffix(ORDER_SUFFIX_LEN)))
}

pub fn new_payment_id() -> PaymentId {
    PaymentId(format!("PAY-{}", random_suffix(PAYMENT_SUFFIX_LEN)))
}

pub fn new_refund_id() -> String {
    format!("REF-{}", random_suffix(REFUND_SUFFIX_LEN))
}

fn random_suffix(len: usize) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut rng = rand::thread_rng();
    (0..len).map(|_| HEX[rng.gen_range(0..HEX.len())] as char).collect()
}

#[cfg(test)]
mod test {
    use souk_common::Fils;

    use super::{delivery_fee, new_order_number, new_payment_id, new_refund_id, vat_on};

    #[test]
    fn delivery_fees_by_emirate() {
        assert_eq!(delivery_fee("DUBAI"), Fils::from_aed(15));
        assert_eq!(delivery_fee("Abu Dhabi"), Fils::from_aed(20));
        assert_eq!(delivery_fee("sharjah"), Fils::from_aed(18));
        assert_eq!(delivery_fee("FUJAIRAH"), Fils::from_aed(30));
        // Unlisted regions fall back to the default
        assert_eq!(delivery_fee("Muscat"), Fils::from_aed(20));
    }

    #[test]
    fn vat_is_five_percent() {
        assert_eq!(vat_on(Fils::from_aed(100)), Fils::from_aed(5));
    }

    #[test]
    fn id_formats() {
        let order = new_order_number();
        assert!(order.as_str().starts_with("ORD-"));
        assert_eq!(order.as_str().len(), 4 + 8);
        let payment = new_payment_id();
        assert!(payment.as_str().starts_with("PAY-"));
        assert_eq!(payment.as_str().len(), 4 + 12);
        let refund = new_refund_id();
        assert!(refund.starts_with("REF-"));
        assert_eq!(refund.len(), 4 + 10);
        assert!(order.as_str()[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
