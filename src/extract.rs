// src/extract.rs

use tracing::{debug, info, info_span};

use crate::normalize::{NormalizeMode, SENTINEL, normalize};
use crate::record::{DocumentRecord, FieldValue, LineItem};
use crate::rules::{DocumentRole, FieldName, FieldRule, LineItemRule, RuleTable};

/// Rows whose description starts with one of these are table totals.
const TOTAL_PREFIXES: [&str; 3] = ["total", "sub total", "grand total"];

/// Apply the role's rules to `text`. Every declared field ends up in the
/// record; unmatched ones hold the sentinel.
pub fn extract(text: &str, table: &RuleTable, role: DocumentRole) -> DocumentRecord {
    let span = info_span!("extract", role = %role, version = table.version());
    let _guard = span.enter();

    let rules = table.role(role);
    let mut record = DocumentRecord::new(role);

    for rule in rules.rules() {
        let value = extract_field(text, rule);
        debug!(field = %rule.field, value = %value, "Field");
        record.insert(rule.field, FieldValue::Text(value));
    }

    if let Some(rule) = rules.line_items() {
        let items = extract_line_items(text, rule);
        debug!(count = items.len(), "Line items");
        let value = if items.is_empty() {
            FieldValue::not_found()
        } else {
            FieldValue::Items(items)
        };
        record.insert(FieldName::LineItems, value);
    }

    let (found, total) = record.coverage();
    info!(found, total, chars = text.len(), "Extraction result");
    record
}

/// First match in document order wins.
fn extract_field(text: &str, rule: &FieldRule) -> String {
    rule.pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| normalize(m.as_str(), rule.normalize))
        .unwrap_or_else(|| SENTINEL.to_string())
}

fn extract_line_items(text: &str, rule: &LineItemRule) -> Vec<LineItem> {
    rule.pattern
        .captures_iter(text)
        .filter_map(|cap| {
            let name = normalize(&cap[1], NormalizeMode::Loose);
            if TOTAL_PREFIXES.iter().any(|p| name.starts_with(p)) {
                return None;
            }
            Some(LineItem {
                name,
                quantity: normalize(&cap[2], NormalizeMode::Numeric),
                unit_price: normalize(&cap[3], NormalizeMode::Numeric),
                amount: normalize(&cap[4], NormalizeMode::Numeric),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;

    const PROFORMA: &str = "\
PROFORMA INVOICE
Company Name: Shree Agro Exports Pvt. Ltd.
Website: www.shreeagro.in
Email: sales@shreeagro.in
GSTIN: 27AAACS1234F1Z5
Contract No: AGR-2024-001
Date: 12-03-2024
Buyer: Gulf Foods Trading LLC
Consignee: Gulf Foods Trading LLC, Dubai
Seller's Bank: HDFC Bank, Fort Branch, Mumbai
Account No: 1234-5678
SWIFT Code: HDFCINBB
Payment Terms: 30% advance, balance against documents
Description Qty Rate Amount
Basmati Rice 1121 Sella 20 850.00 17000.00
Sona Masoori Rice 10 640.50 6405.00
TOTAL 30 23405.00
Net Weight: 30000 KGS
Gross Weight: 30150.5 KGS
Variation: +/- 5%
Amount in words: Twenty three thousand four hundred five US dollars only
Packing: 50 kg PP bags
Loading Port: Nhava Sheva,
Mumbai, India Destination Port: Jebel Ali, UAE
Shipment: Within 30 days of advance
";

    fn proforma() -> DocumentRecord {
        extract(PROFORMA, rules::builtin().unwrap(), DocumentRole::Proforma)
    }

    #[test]
    fn contract_number_is_normalized() {
        let record = proforma();
        assert_eq!(
            record.text(FieldName::ContractNo),
            Some(normalize("AGR-2024-001", NormalizeMode::Strict).as_str())
        );
    }

    #[test]
    fn scalar_fields() {
        let record = proforma();
        assert_eq!(record.text(FieldName::CompanyName), Some("shree agro exports pvt ltd"));
        assert_eq!(record.text(FieldName::Date), Some("12032024"));
        assert_eq!(record.text(FieldName::Swift), Some("hdfcinbb"));
        assert_eq!(record.text(FieldName::AccountNo), Some("12345678"));
        assert_eq!(record.text(FieldName::Gstin), Some("27aaacs1234f1z5"));
        assert_eq!(record.text(FieldName::NetWeight), Some("30000"));
        assert_eq!(record.text(FieldName::GrossWeight), Some("30150.5"));
        assert_eq!(record.text(FieldName::Packing), Some("50 kg pp bags"));
        assert_eq!(
            record.text(FieldName::SellerBank),
            Some("hdfc bank fort branch mumbai")
        );
    }

    #[test]
    fn loading_port_spans_lines_until_next_label() {
        let record = proforma();
        assert_eq!(
            record.text(FieldName::LoadingPort),
            Some("nhava sheva mumbai india")
        );
        assert_eq!(record.text(FieldName::DestinationPort), Some("jebel ali uae"));
    }

    #[test]
    fn loading_port_stops_at_any_following_label() {
        let text = "Destination Port: Jebel Ali, UAE\nLoading Port: India\nBuyer: Gulf Foods\nShipment: Within 30 days\n";
        let record = extract(text, rules::builtin().unwrap(), DocumentRole::Agreement);
        assert_eq!(record.text(FieldName::LoadingPort), Some("india"));
        assert_eq!(record.text(FieldName::Buyer), Some("gulf foods"));

        let wrapped = "Loading Port: Nhava Sheva,\n  Mumbai, India\nConsignee: Gulf Foods\n";
        let record = extract(wrapped, rules::builtin().unwrap(), DocumentRole::Proforma);
        assert_eq!(record.text(FieldName::LoadingPort), Some("nhava sheva mumbai india"));
    }

    #[test]
    fn first_match_wins() {
        let text = "Contract No: FIRST-1\nContract No: SECOND-2\n";
        let record = extract(text, rules::builtin().unwrap(), DocumentRole::Agreement);
        assert_eq!(record.text(FieldName::ContractNo), Some("first1"));
    }

    #[test]
    fn line_items_skip_totals() {
        let record = proforma();
        let Some(FieldValue::Items(items)) = record.get(FieldName::LineItems) else {
            panic!("expected line items");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "basmati rice 1121 sella");
        assert_eq!(items[0].quantity, "20");
        assert_eq!(items[0].unit_price, "850.00");
        assert_eq!(items[0].amount, "17000.00");
        assert_eq!(items[1].name, "sona masoori rice");
    }

    #[test]
    fn empty_text_yields_all_sentinels() {
        let table = rules::builtin().unwrap();
        for role in [DocumentRole::Proforma, DocumentRole::Agreement] {
            let record = extract("", table, role);
            assert_eq!(record.len(), table.role(role).fields().len());
            for field in table.role(role).fields() {
                assert!(record.get(field).unwrap().is_sentinel(), "{field} not sentinel");
            }
        }
    }

    #[test]
    fn agreement_declares_its_own_field_set() {
        let record = extract(PROFORMA, rules::builtin().unwrap(), DocumentRole::Agreement);
        assert!(!record.contains(FieldName::Website));
        assert!(!record.contains(FieldName::LineItems));
        assert_eq!(record.text(FieldName::Swift), Some("hdfcinbb"));
    }
}
