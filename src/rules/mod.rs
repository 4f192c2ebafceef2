// src/rules/mod.rs

mod builtin;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RuleError;
use crate::normalize::NormalizeMode;

/// Every field the engine knows how to extract. Rule tables refer to fields
/// by these names only; anything else is rejected when the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    CompanyName,
    ContractNo,
    Date,
    SellerBank,
    AccountNo,
    Swift,
    PaymentTerms,
    NetWeight,
    GrossWeight,
    Variation,
    AmountWords,
    Packing,
    LoadingPort,
    DestinationPort,
    Shipment,
    Website,
    Email,
    Gstin,
    Consignee,
    Buyer,
    LineItems,
}

impl FieldName {
    pub const ALL: [FieldName; 21] = [
        Self::CompanyName,
        Self::ContractNo,
        Self::Date,
        Self::SellerBank,
        Self::AccountNo,
        Self::Swift,
        Self::PaymentTerms,
        Self::NetWeight,
        Self::GrossWeight,
        Self::Variation,
        Self::AmountWords,
        Self::Packing,
        Self::LoadingPort,
        Self::DestinationPort,
        Self::Shipment,
        Self::Website,
        Self::Email,
        Self::Gstin,
        Self::Consignee,
        Self::Buyer,
        Self::LineItems,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyName => "company_name",
            Self::ContractNo => "contract_no",
            Self::Date => "date",
            Self::SellerBank => "seller_bank",
            Self::AccountNo => "account_no",
            Self::Swift => "swift",
            Self::PaymentTerms => "payment_terms",
            Self::NetWeight => "net_weight",
            Self::GrossWeight => "gross_weight",
            Self::Variation => "variation",
            Self::AmountWords => "amount_words",
            Self::Packing => "packing",
            Self::LoadingPort => "loading_port",
            Self::DestinationPort => "destination_port",
            Self::Shipment => "shipment",
            Self::Website => "website",
            Self::Email => "email",
            Self::Gstin => "gstin",
            Self::Consignee => "consignee",
            Self::Buyer => "buyer",
            Self::LineItems => "line_items",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| RuleError::UnknownField(s.to_string()))
    }
}

/// Which of the two documents a record or rule set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    Proforma,
    Agreement,
}

impl DocumentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proforma => "proforma",
            Self::Agreement => "agreement",
        }
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equivalence used when a field is compared across the two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    #[default]
    Exact,
    /// The agreement value must occur inside the proforma value.
    Substring,
    #[serde(alias = "numeric")]
    NumericOnly,
}

/// One compiled extraction rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: FieldName,
    pub pattern: Regex,
    pub normalize: NormalizeMode,
    pub compare: CompareMode,
    pub multiline: bool,
}

/// Row pattern for tabular line items: four capture groups, in order
/// name, quantity, unit price, amount.
#[derive(Debug, Clone)]
pub struct LineItemRule {
    pub pattern: Regex,
}

/// The rules declared for one document role.
#[derive(Debug, Clone, Default)]
pub struct RoleRules {
    rules: Vec<FieldRule>,
    line_items: Option<LineItemRule>,
}

impl RoleRules {
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn line_items(&self) -> Option<&LineItemRule> {
        self.line_items.as_ref()
    }

    /// Declared fields in declaration order, line items last.
    pub fn fields(&self) -> Vec<FieldName> {
        let mut fields: Vec<FieldName> = self.rules.iter().map(|r| r.field).collect();
        if self.line_items.is_some() {
            fields.push(FieldName::LineItems);
        }
        fields
    }

    pub fn declares(&self, field: FieldName) -> bool {
        match field {
            FieldName::LineItems => self.line_items.is_some(),
            other => self.rules.iter().any(|r| r.field == other),
        }
    }

    pub fn compare_mode(&self, field: FieldName) -> Option<CompareMode> {
        match field {
            FieldName::LineItems => self.line_items.as_ref().map(|_| CompareMode::Exact),
            other => self.rules.iter().find(|r| r.field == other).map(|r| r.compare),
        }
    }
}

/// A field that gates the verdict, with the equivalence used for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompareField {
    pub field: FieldName,
    pub mode: CompareMode,
}

/// Versioned extraction rules for both document roles, plus the ordered set
/// of fields the comparator checks.
#[derive(Debug, Clone)]
pub struct RuleTable {
    version: u32,
    proforma: RoleRules,
    agreement: RoleRules,
    compare_fields: Vec<CompareField>,
}

// ---------------------------------------------------------------------------
// Declarative form (TOML)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RuleTableSpec {
    pub version: u32,
    pub proforma: RoleSpec,
    pub agreement: RoleSpec,
    /// Defaults to every field declared for both roles, in proforma order.
    #[serde(default)]
    pub compare_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleSpec {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub line_items: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub field: String,
    pub pattern: String,
    #[serde(default)]
    pub normalize: NormalizeMode,
    #[serde(default)]
    pub compare: CompareMode,
    #[serde(default)]
    pub multiline: bool,
}

impl RuleSpec {
    pub fn new(field: &str, pattern: &str, normalize: NormalizeMode, compare: CompareMode) -> Self {
        Self {
            field: field.to_string(),
            pattern: pattern.to_string(),
            normalize,
            compare,
            multiline: false,
        }
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }
}

fn compile(field: &str, pattern: &str, multiline: bool, groups: usize) -> Result<Regex, RuleError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(multiline)
        .build()
        .map_err(|e| RuleError::InvalidPattern {
            field: field.to_string(),
            message: e.to_string(),
        })?;

    // captures_len counts the implicit whole-match group
    let found = re.captures_len() - 1;
    if found != groups {
        return Err(RuleError::CaptureGroups {
            field: field.to_string(),
            expected: groups,
            found,
        });
    }
    Ok(re)
}

fn build_role(role: DocumentRole, spec: &RoleSpec) -> Result<RoleRules, RuleError> {
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(spec.rules.len());

    for rule in &spec.rules {
        let field: FieldName = rule.field.parse()?;
        if field == FieldName::LineItems {
            return Err(RuleError::LineItemsAsScalar(rule.field.clone()));
        }
        if !seen.insert(field) {
            return Err(RuleError::DuplicateField {
                role: role.to_string(),
                field: rule.field.clone(),
            });
        }
        rules.push(FieldRule {
            field,
            pattern: compile(&rule.field, &rule.pattern, rule.multiline, 1)?,
            normalize: rule.normalize,
            compare: rule.compare,
            multiline: rule.multiline,
        });
    }

    let line_items = spec
        .line_items
        .as_deref()
        .map(|pattern| {
            compile(FieldName::LineItems.as_str(), pattern, false, 4)
                .map(|pattern| LineItemRule { pattern })
        })
        .transpose()?;

    Ok(RoleRules { rules, line_items })
}

impl RuleTable {
    pub fn from_spec(spec: &RuleTableSpec) -> Result<Self, RuleError> {
        let proforma = build_role(DocumentRole::Proforma, &spec.proforma)?;
        let agreement = build_role(DocumentRole::Agreement, &spec.agreement)?;

        let fields: Vec<FieldName> = match &spec.compare_fields {
            Some(names) => names
                .iter()
                .map(|n| n.parse::<FieldName>())
                .collect::<Result<Vec<_>, _>>()?,
            None => proforma
                .fields()
                .into_iter()
                .filter(|f| agreement.declares(*f))
                .collect(),
        };

        let mut compare_fields = Vec::with_capacity(fields.len());
        for field in fields {
            for (role, rules) in [
                (DocumentRole::Proforma, &proforma),
                (DocumentRole::Agreement, &agreement),
            ] {
                if !rules.declares(field) {
                    return Err(RuleError::UndeclaredCompareField {
                        role: role.to_string(),
                        field: field.to_string(),
                    });
                }
            }
            let mode = proforma.compare_mode(field).unwrap_or_default();
            if agreement.compare_mode(field) != Some(mode) {
                return Err(RuleError::ConflictingCompareMode(field.to_string()));
            }
            compare_fields.push(CompareField { field, mode });
        }

        info!(
            version = spec.version,
            proforma_fields = proforma.fields().len(),
            agreement_fields = agreement.fields().len(),
            compared = compare_fields.len(),
            "Rule table built"
        );

        Ok(Self {
            version: spec.version,
            proforma,
            agreement,
            compare_fields,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        let spec: RuleTableSpec =
            toml::from_str(content).map_err(|e| RuleError::Parse(e.to_string()))?;
        Self::from_spec(&spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RuleError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn role(&self, role: DocumentRole) -> &RoleRules {
        match role {
            DocumentRole::Proforma => &self.proforma,
            DocumentRole::Agreement => &self.agreement,
        }
    }

    pub fn compare_fields(&self) -> &[CompareField] {
        &self.compare_fields
    }
}

static BUILTIN: LazyLock<Result<RuleTable, RuleError>> =
    LazyLock::new(|| RuleTable::from_spec(&builtin::spec()));

/// The rule table compiled into the binary. Built once per process.
pub fn builtin() -> Result<&'static RuleTable, RuleError> {
    BUILTIN.as_ref().map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_spec(rules: Vec<RuleSpec>) -> RoleSpec {
        RoleSpec {
            rules,
            line_items: None,
        }
    }

    fn table_spec(proforma: Vec<RuleSpec>, agreement: Vec<RuleSpec>) -> RuleTableSpec {
        RuleTableSpec {
            version: 7,
            proforma: role_spec(proforma),
            agreement: role_spec(agreement),
            compare_fields: None,
        }
    }

    fn contract_rule() -> RuleSpec {
        RuleSpec::new(
            "contract_no",
            r"Contract\s+No[:\s]*(\S+)",
            NormalizeMode::Strict,
            CompareMode::Exact,
        )
    }

    #[test]
    fn builtin_table_builds() {
        let table = builtin().unwrap();
        assert_eq!(table.version(), 1);
        assert!(table.role(DocumentRole::Proforma).declares(FieldName::ContractNo));
        assert!(table.role(DocumentRole::Proforma).declares(FieldName::LineItems));
        assert!(!table.role(DocumentRole::Agreement).declares(FieldName::Website));
        // every compared field is declared for both roles
        for cf in table.compare_fields() {
            assert!(table.role(DocumentRole::Proforma).declares(cf.field));
            assert!(table.role(DocumentRole::Agreement).declares(cf.field));
        }
    }

    #[test]
    fn field_names_round_trip() {
        for field in FieldName::ALL {
            assert_eq!(field.as_str().parse::<FieldName>().unwrap(), field);
        }
        assert!(matches!(
            "contractno".parse::<FieldName>(),
            Err(RuleError::UnknownField(_))
        ));
    }

    #[test]
    fn pattern_without_capture_group_is_rejected() {
        let bad = RuleSpec::new("swift", r"SWIFT[:\s]*\w+", NormalizeMode::Strict, CompareMode::Exact);
        let err = RuleTable::from_spec(&table_spec(vec![bad], vec![])).unwrap_err();
        assert!(matches!(err, RuleError::CaptureGroups { expected: 1, found: 0, .. }));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let bad = RuleSpec::new("swift", r"SWIFT(\w+", NormalizeMode::Strict, CompareMode::Exact);
        let err = RuleTable::from_spec(&table_spec(vec![bad], vec![])).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let spec = table_spec(vec![contract_rule(), contract_rule()], vec![]);
        assert!(matches!(
            RuleTable::from_spec(&spec).unwrap_err(),
            RuleError::DuplicateField { .. }
        ));
    }

    #[test]
    fn compare_fields_default_to_intersection() {
        let date = RuleSpec::new("date", r"Date[:\s]*(\S+)", NormalizeMode::Strict, CompareMode::Exact);
        let spec = table_spec(vec![contract_rule(), date], vec![contract_rule()]);
        let table = RuleTable::from_spec(&spec).unwrap();
        let fields: Vec<FieldName> = table.compare_fields().iter().map(|c| c.field).collect();
        assert_eq!(fields, vec![FieldName::ContractNo]);
    }

    #[test]
    fn explicit_compare_field_must_exist_on_both_roles() {
        let mut spec = table_spec(vec![contract_rule()], vec![]);
        spec.compare_fields = Some(vec!["contract_no".into()]);
        assert!(matches!(
            RuleTable::from_spec(&spec).unwrap_err(),
            RuleError::UndeclaredCompareField { .. }
        ));
    }

    #[test]
    fn conflicting_compare_modes_are_rejected() {
        let mut loose = contract_rule();
        loose.compare = CompareMode::Substring;
        let spec = table_spec(vec![contract_rule()], vec![loose]);
        assert!(matches!(
            RuleTable::from_spec(&spec).unwrap_err(),
            RuleError::ConflictingCompareMode(_)
        ));
    }

    #[test]
    fn table_loads_from_toml() {
        let toml = r#"
version = 2
compare_fields = ["account_no"]

[[proforma.rules]]
field = "account_no"
pattern = 'Account\s+No[:\s]*([0-9\-]+)'
normalize = "numeric"
compare = "numeric_only"

[[agreement.rules]]
field = "account_no"
pattern = 'A/C[:\s]*([0-9\-]+)'
normalize = "numeric"
compare = "numeric_only"
"#;
        let table = RuleTable::from_toml(toml).unwrap();
        assert_eq!(table.version(), 2);
        assert_eq!(
            table.compare_fields(),
            &[CompareField {
                field: FieldName::AccountNo,
                mode: CompareMode::NumericOnly
            }]
        );
    }

    #[test]
    fn line_items_need_four_groups() {
        let mut spec = table_spec(vec![], vec![]);
        spec.proforma.line_items = Some(r"(\w+)\s+(\d+)".into());
        assert!(matches!(
            RuleTable::from_spec(&spec).unwrap_err(),
            RuleError::CaptureGroups { expected: 4, found: 2, .. }
        ));
    }
}
