//! Field metadata: optypes, term analysis and the per-model field set.

use std::collections::{BTreeMap, HashMap};

/// Missing tokens the service applies when a model does not list its own.
pub const DEFAULT_MISSING_TOKENS: &[&str] = &[
    "", "N/A", "n/a", "NULL", "null", "-", "#DIV/0", "#REF!", "#NAME?", "NIL", "nil", "NA", "na",
    "#VALUE!", "#NULL!", "NaN", "#N/A", "#NUM!", "?",
];

/// Declared operational type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Optype {
    Numeric,
    Categorical,
    Text,
    Items,
    Datetime,
}

impl Optype {
    /// Parse the service's optype name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "numeric" => Some(Optype::Numeric),
            "categorical" => Some(Optype::Categorical),
            "text" => Some(Optype::Text),
            "items" => Some(Optype::Items),
            "datetime" => Some(Optype::Datetime),
            _ => None,
        }
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, Optype::Numeric)
    }
}

/// How text is split into terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenMode {
    /// Word tokens only.
    TokensOnly,
    /// The whole string is one term.
    FullTermsOnly,
    /// Both tokens and the whole string.
    All,
}

impl TokenMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tokens_only" => Some(TokenMode::TokensOnly),
            "full_terms_only" => Some(TokenMode::FullTermsOnly),
            "all" => Some(TokenMode::All),
            _ => None,
        }
    }
}

/// Term analysis settings of a text field.
///
/// Unset values take context-dependent defaults: predicates default to
/// [`TokenMode::TokensOnly`], cluster term extraction to [`TokenMode::All`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TermAnalysis {
    pub token_mode: Option<TokenMode>,
    pub case_sensitive: Option<bool>,
}

impl TermAnalysis {
    #[inline]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive.unwrap_or(true)
    }
}

/// A model field. Immutable once a model is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub optype: Optype,
    pub term_analysis: TermAnalysis,
    /// Synonym forms per term.
    pub term_forms: HashMap<String, Vec<String>>,
    /// Training vocabulary of a text field.
    pub tag_cloud: Vec<String>,
    /// Separator of items fields.
    pub item_separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl Field {
    /// A field with no text metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>, optype: Optype) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            optype,
            term_analysis: TermAnalysis::default(),
            term_forms: HashMap::new(),
            tag_cloud: Vec::new(),
            item_separator: None,
            prefix: None,
            suffix: None,
        }
    }

    pub fn with_term_analysis(mut self, term_analysis: TermAnalysis) -> Self {
        self.term_analysis = term_analysis;
        self
    }

    pub fn with_term_forms(mut self, term_forms: HashMap<String, Vec<String>>) -> Self {
        self.term_forms = term_forms;
        self
    }

    pub fn with_tag_cloud(mut self, tag_cloud: Vec<String>) -> Self {
        self.tag_cloud = tag_cloud;
        self
    }

    /// The term followed by its registered synonym forms.
    pub fn forms_of<'a>(&'a self, term: &'a str) -> Vec<&'a str> {
        let mut forms = vec![term];
        if let Some(extra) = self.term_forms.get(term) {
            forms.extend(extra.iter().map(String::as_str));
        }
        forms
    }

    /// Map a form back to the term it is registered under.
    pub fn canonical_term<'a>(&'a self, form: &'a str) -> &'a str {
        self.term_forms
            .iter()
            .find(|(_, forms)| forms.iter().any(|f| f == form))
            .map(|(term, _)| term.as_str())
            .unwrap_or(form)
    }
}

/// The fields of one model, keyed by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSet {
    fields: BTreeMap<String, Field>,
    by_name: HashMap<String, String>,
    objective_id: Option<String>,
    missing_tokens: Vec<String>,
}

impl FieldSet {
    /// Create a field set using [`DEFAULT_MISSING_TOKENS`].
    pub fn new(fields: impl IntoIterator<Item = Field>, objective_id: Option<String>) -> Self {
        let fields: BTreeMap<String, Field> =
            fields.into_iter().map(|f| (f.id.clone(), f)).collect();
        let by_name = fields
            .values()
            .map(|f| (f.name.clone(), f.id.clone()))
            .collect();
        Self {
            fields,
            by_name,
            objective_id,
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_missing_tokens(mut self, tokens: Vec<String>) -> Self {
        self.missing_tokens = tokens;
        self
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Field> {
        self.fields.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.fields.contains_key(id)
    }

    /// Field id registered under a display name.
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Display name of a field, falling back to the id.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.fields.get(id).map(|f| f.name.as_str()).unwrap_or(id)
    }

    #[inline]
    pub fn objective_id(&self) -> Option<&str> {
        self.objective_id.as_deref()
    }

    #[inline]
    pub fn missing_tokens(&self) -> &[String] {
        &self.missing_tokens
    }

    #[inline]
    pub fn is_missing_token(&self, text: &str) -> bool {
        self.missing_tokens.iter().any(|t| t == text)
    }

    /// Fields in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
