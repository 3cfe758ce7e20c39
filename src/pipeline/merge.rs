//! Page merging: reduce one document's per-page results to a single record.
//!
//! Shipping bills spread their data over several pages (header and parties on
//! page 1, item details and totals on page 2). Two rules apply:
//!
//! * **Scalars** — last writer wins. A value present on a later page replaces
//!   whatever an earlier page reported; an absent value leaves it untouched.
//!   Blank text counts as absent, so it never erases an earlier value.
//! * **Line items** — concatenated in page order. A later page never replaces
//!   an earlier page's items.
//!
//! A plain "overwrite every field" reduction would silently drop page 1's
//! items whenever page 2 also lists items, so the two rules are kept apart.

use crate::record::{LineItem, PartialRecord};
use rust_decimal::Decimal;

/// Whether a page actually reported a value for a field.
trait Reported {
    fn is_reported(&self) -> bool;
}

impl Reported for Option<String> {
    fn is_reported(&self) -> bool {
        self.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

impl Reported for Option<i64> {
    fn is_reported(&self) -> bool {
        self.is_some()
    }
}

impl Reported for Option<Decimal> {
    fn is_reported(&self) -> bool {
        self.is_some()
    }
}

/// Overwrite each named field of `$acc` with `$page`'s value when reported.
macro_rules! overlay {
    ($acc:ident <- $page:ident: $($field:ident),+ $(,)?) => {
        $(
            if $page.$field.is_reported() {
                $acc.$field = $page.$field;
            }
        )+
    };
}

/// Merge page results (in page order) into one partial record.
///
/// An empty input, or pages that report nothing, yield an all-absent record
/// with no line items.
pub fn merge_pages<I>(pages: I) -> PartialRecord
where
    I: IntoIterator<Item = PartialRecord>,
{
    let mut merged = PartialRecord::default();
    let mut items: Vec<LineItem> = Vec::new();

    for mut page in pages {
        if let Some(page_items) = page.line_items.take() {
            items.extend(page_items);
        }

        overlay!(merged <- page:
            csb_number,
            filing_date,
            courier_registration_number,
            courier_name,
            hawb_number,
            number_of_packages,
            declared_weight_kg,
            airport_of_destination,
            consignor_name,
            consignor_address,
            consignee_name,
            consignee_address,
            invoice_number,
            invoice_date,
            fob_value_inr,
            fob_value_foreign,
            fob_currency,
        );
    }

    if !items.is_empty() {
        merged.line_items = Some(items);
    }
    merged
}
