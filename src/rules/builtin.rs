// src/rules/builtin.rs

use super::{CompareMode, RoleSpec, RuleSpec, RuleTableSpec};
use crate::normalize::NormalizeMode::{Loose, Numeric, Strict};

use CompareMode::{Exact, NumericOnly, Substring};

/// `<description> <qty> <unit price> <amount>` on a single line.
const LINE_ITEM_ROW: &str = r"(?m)^[ \t]*([A-Za-z][^\n]*?)[ \t]+([0-9][0-9,]*(?:\.[0-9]+)?)[ \t]+([0-9][0-9,]*\.[0-9]{2})[ \t]+([0-9][0-9,]*\.[0-9]{2})[ \t]*$";

// A port may wrap over several lines. The value ends at the next known label
// (inline `Destination Port` or any label opening a line), a blank line, or
// the end of the text.
const LOADING_PORT: &str = concat!(
    r"Loading\s+Port[:\s]*(.+?)",
    r"(?:\s*Destination\s+Port|\n[ \t]*\n|\n[ \t]*",
    r"(?:Company\s+Name|Contract\s+No|Date|Seller|Account\s+No|SWIFT|Payment\s+Terms",
    r"|Net\s+Weight|Gross\s+Weight|Variation|Amount\s+in\s+words|Packing|Shipment",
    r"|Consignee|Buyer|Website|E-?mail|GST|Description)\b|\z)",
);

fn shared_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new("company_name", r"Company\s+Name[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("contract_no", r"\bContract\s+No\.?[:\s]*([A-Za-z0-9\-/]+)", Strict, Exact),
        RuleSpec::new("date", r"\bDate[:\s]*([0-9][0-9\-/\.]*)", Strict, Exact),
        RuleSpec::new("seller_bank", r"Seller(?:'|’)?s\s+Bank[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("account_no", r"\bAccount\s+No\.?[:\s]*([0-9][0-9\- ]*)", Numeric, NumericOnly),
        RuleSpec::new("swift", r"\bSWIFT(?:\s+Code)?[:\s]*([A-Za-z0-9]+)", Strict, Exact),
        RuleSpec::new("payment_terms", r"Payment\s+Terms[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("net_weight", r"Net\s+Weight[:\s]*([0-9][0-9,\.]*)", Numeric, NumericOnly),
        RuleSpec::new("gross_weight", r"Gross\s+Weight[:\s]*([0-9][0-9,\.]*)", Numeric, NumericOnly),
        RuleSpec::new("variation", r"\bVariation[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("amount_words", r"Amount\s+in\s+words[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("packing", r"\bPacking\b[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("loading_port", LOADING_PORT, Loose, Substring).multiline(),
        RuleSpec::new("destination_port", r"Destination\s+Port[:\s]*(.+)", Loose, Substring),
        RuleSpec::new("shipment", r"\bShipment[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("consignee", r"\bConsignee[:\s]*(.+)", Loose, Exact),
        RuleSpec::new("buyer", r"\bBuyer[:\s]*(.+)", Loose, Exact),
    ]
}

/// Version 1 of the built-in table. The proforma carries the seller's
/// letterhead details and the goods table; the agreement does not.
pub(super) fn spec() -> RuleTableSpec {
    let mut proforma = shared_rules();
    proforma.extend([
        RuleSpec::new("website", r"\bWebsite[:\s]*(\S+)", Strict, Exact),
        RuleSpec::new("email", r"\bE-?mail[:\s]*(\S+)", Strict, Exact),
        RuleSpec::new("gstin", r"\bGST(?:IN)?(?:\s+No\.?)?[:\s]*([A-Za-z0-9]+)", Strict, Exact),
    ]);

    RuleTableSpec {
        version: 1,
        proforma: RoleSpec {
            rules: proforma,
            line_items: Some(LINE_ITEM_ROW.to_string()),
        },
        agreement: RoleSpec {
            rules: shared_rules(),
            line_items: None,
        },
        compare_fields: None,
    }
}
