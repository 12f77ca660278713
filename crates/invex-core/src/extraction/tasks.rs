//! Declarative catalog of extraction tasks.
//!
//! Each task is described by data only: a schema of the fields the model must
//! return, the instruction text around it and the model that runs it. The
//! prompt template is derived from that description once, at construction.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ExtractionError;
use crate::models::config::TaskModelConfig;

/// Substitution point for the document text in a prompt template.
pub const PAGE_DATA_PLACEHOLDER: &str = "{page_data}";

/// The four semantic sections of an invoice, one extraction task each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Invoice header: number, dates, order references.
    General,
    /// Supplier, customer and shipping parties.
    SupplierCustomer,
    /// Line items.
    Item,
    /// Totals, per-rate VAT amounts.
    Total,
}

impl TaskKind {
    /// All tasks in merge order.
    pub const ALL: [TaskKind; 4] = [
        TaskKind::General,
        TaskKind::SupplierCustomer,
        TaskKind::Item,
        TaskKind::Total,
    ];

    /// Key of this task's record in the composite result.
    pub fn result_key(self) -> &'static str {
        match self {
            TaskKind::General => "General_data",
            TaskKind::SupplierCustomer => "Supplier_customer_data",
            TaskKind::Item => "Item_data",
            TaskKind::Total => "Total_amount",
        }
    }

    /// Short name used in logs and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::General => "general",
            TaskKind::SupplierCustomer => "supplier_customer",
            TaskKind::Item => "item",
            TaskKind::Total => "total",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TaskKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Shape of a schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// A single value, `"None"` when absent.
    Value,
    /// A nested object.
    Group(Vec<FieldSpec>),
    /// A list of objects, even when there is only one entry.
    List(Vec<FieldSpec>),
}

/// One field of a task schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// JSON key the model must use.
    pub name: String,
    /// Not every invoice has this field.
    pub optional: bool,
    /// Extra guidance appended to the field line.
    pub hint: Option<String>,
    /// Value, group or list.
    pub shape: FieldShape,
}

impl FieldSpec {
    /// A single-value field.
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            hint: None,
            shape: FieldShape::Value,
        }
    }

    /// A nested object field.
    pub fn group(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            shape: FieldShape::Group(fields),
            ..Self::value(name)
        }
    }

    /// A repeating field.
    pub fn list(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            shape: FieldShape::List(fields),
            ..Self::value(name)
        }
    }

    /// Mark the field as not present on all invoices.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Attach guidance for the model.
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn render(&self, indent: usize, out: &mut String) {
        let pad = "  ".repeat(indent);
        let availability = match (&self.shape, self.optional) {
            (FieldShape::Value, true) | (FieldShape::List(_), true) => {
                " (not available on all invoices)"
            }
            (FieldShape::Group(_), true) => " (only if available on the invoice)",
            _ => "",
        };
        let kind = match self.shape {
            FieldShape::Value => "",
            FieldShape::Group(_) => ", an object with",
            FieldShape::List(_) => ", a list with one entry each, always a list even for one entry, of",
        };

        out.push_str(&format!("{pad}- {}{availability}{kind}", self.name));
        if let Some(hint) = &self.hint {
            out.push_str(&format!(" # {hint}"));
        }
        out.push('\n');

        if let FieldShape::Group(fields) | FieldShape::List(fields) = &self.shape {
            for field in fields {
                field.render(indent + 1, out);
            }
        }
    }
}

/// One extraction task: schema, prompt and model.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    kind: TaskKind,
    model: String,
    fields: Vec<FieldSpec>,
    template: String,
    placeholder_at: usize,
}

impl TaskSpec {
    /// Build a task whose template is derived from its schema.
    ///
    /// `instruction` introduces the field list, `rules` follow it.
    pub fn new(
        kind: TaskKind,
        model: impl Into<String>,
        instruction: &str,
        fields: Vec<FieldSpec>,
        rules: &[&str],
    ) -> Self {
        let mut template = format!("### INVOICE:\n{PAGE_DATA_PLACEHOLDER}\n\n### INSTRUCTION:\n{instruction}\n");
        for field in &fields {
            field.render(0, &mut template);
        }
        template.push('\n');
        for rule in rules.iter().chain(COMMON_RULES) {
            template.push_str(rule);
            template.push('\n');
        }

        let placeholder_at = "### INVOICE:\n".len();
        Self {
            kind,
            model: model.into(),
            fields,
            template,
            placeholder_at,
        }
    }

    /// Replace the derived template with a custom one.
    ///
    /// The template must contain exactly one `{page_data}` placeholder.
    pub fn with_template(mut self, template: impl Into<String>) -> Result<Self, ExtractionError> {
        let template = template.into();
        let mut positions = template.match_indices(PAGE_DATA_PLACEHOLDER).map(|(i, _)| i);

        let (Some(at), None) = (positions.next(), positions.next()) else {
            return Err(ExtractionError::Template {
                task: self.kind,
                reason: format!("expected exactly one {PAGE_DATA_PLACEHOLDER} placeholder"),
            });
        };

        self.template = template;
        self.placeholder_at = at;
        Ok(self)
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Task kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Declared schema.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Prompt template with its placeholder.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the prompt for a document.
    ///
    /// The text is inserted verbatim; placeholders inside it are left alone.
    pub fn render(&self, document_text: &str) -> String {
        let (before, after) = self.template.split_at(self.placeholder_at);
        let after = &after[PAGE_DATA_PLACEHOLDER.len()..];

        let mut prompt = String::with_capacity(self.template.len() + document_text.len());
        prompt.push_str(before);
        prompt.push_str(document_text);
        prompt.push_str(after);
        prompt
    }

    /// Declared fields missing from a parsed record, as dotted paths.
    ///
    /// Top-level lists are checked element by element. Optional groups may be
    /// absent; every other declared key is expected, with `"None"` standing in
    /// for values the invoice does not have.
    pub fn missing_fields(&self, record: &Value) -> Vec<String> {
        let mut missing = Vec::new();
        collect_missing(&self.fields, record, "", &mut missing);
        missing
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn collect_missing(fields: &[FieldSpec], value: &Value, prefix: &str, missing: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_missing(fields, item, &format!("{prefix}[{i}]"), missing);
            }
        }
        Value::Object(map) => {
            for field in fields {
                let path = join_path(prefix, &field.name);
                match (map.get(&field.name), &field.shape) {
                    (None, FieldShape::Group(_)) if field.optional => {}
                    (None, _) => missing.push(path),
                    (Some(_), FieldShape::Value) => {}
                    (Some(nested), FieldShape::Group(sub) | FieldShape::List(sub)) => {
                        collect_missing(sub, nested, &path, missing);
                    }
                }
            }
        }
        // "None" or another scalar in place of an object stands for the whole section.
        _ => {}
    }
}

const COMMON_RULES: &[&str] = &[
    "If data are not available, the data should be \"None\"",
    "Use values only from the invoice, do not make up any values on your own",
    "Output the information in JSON format with the above mentioned keys.",
    "No PREAMBLE",
];

fn general(model: &str) -> TaskSpec {
    TaskSpec::new(
        TaskKind::General,
        model,
        "Extract the following general data from the invoice:",
        vec![
            FieldSpec::value("Invoice number"),
            FieldSpec::value("Invoice date"),
            FieldSpec::value("Invoice period").optional(),
            FieldSpec::value("Payment due date").optional(),
            FieldSpec::value("Order number").optional(),
            FieldSpec::value("Order date").optional(),
        ],
        &["If there are multiple invoices, provide the details for all of them as a list"],
    )
}

fn party(prefix: &str, all_optional: bool) -> Vec<FieldSpec> {
    let required = ["Name", "Address", "City", "Postal code"];
    let optional = ["Country", "VAT Number", "Tax number"];

    required
        .iter()
        .map(|f| {
            let field = FieldSpec::value(format!("{prefix} {f}"));
            if all_optional { field.optional() } else { field }
        })
        .chain(
            optional
                .iter()
                .map(|f| FieldSpec::value(format!("{prefix} {f}")).optional()),
        )
        .collect()
}

fn supplier_customer(model: &str) -> TaskSpec {
    TaskSpec::new(
        TaskKind::SupplierCustomer,
        model,
        "Extract the following supplier and customer data from the invoice:",
        vec![
            FieldSpec::group("Supplier data", party("Supplier", false)),
            FieldSpec::group("Customer data", party("Customer", true)),
            FieldSpec::group("Customer Shipping data", party("Customer Shipping", true)).optional(),
        ],
        &["Use the section names as top-level keys and nest their fields under them"],
    )
}

fn item(model: &str) -> TaskSpec {
    TaskSpec::new(
        TaskKind::Item,
        model,
        "Extract the following data for each item on the invoice:",
        vec![FieldSpec::list(
            "Item data",
            vec![
                FieldSpec::value("Service or product description"),
                FieldSpec::value("Service or product quantity"),
                FieldSpec::value("Service or product net amount"),
                FieldSpec::value("Service or product VAT rate"),
                FieldSpec::value("Service or product VAT amount"),
                FieldSpec::value("Service or product gross amount"),
            ],
        )],
        &[],
    )
}

fn total(model: &str) -> TaskSpec {
    let per_rate = |amount: &str| {
        vec![
            FieldSpec::value("VAT rate"),
            FieldSpec::value(amount),
        ]
    };

    TaskSpec::new(
        TaskKind::Total,
        model,
        "Extract the following total amount data from the invoice:",
        vec![
            FieldSpec::value("Total net amount").hint("the amount before inclusion of tax"),
            FieldSpec::value("Total net amount tax free").optional(),
            FieldSpec::list("Total net amount per each VAT", per_rate("Net amount"))
                .hint("the net amount before tax for each VAT rate"),
            FieldSpec::list("Total VAT amount per each VAT", per_rate("VAT amount"))
                .hint("the tax value for each VAT rate"),
            FieldSpec::value("Total VAT amount").hint("the total VAT amount"),
            FieldSpec::value("Total gross amount").hint("the amount after inclusion of tax"),
            FieldSpec::value("VAT exemption statement").optional().hint(
                "statement, usually below the total gross amount, that VAT has not been charged; \
                 in that case Total VAT amount = 0",
            ),
        ],
        &[],
    )
}

/// The ordered set of tasks run against every document.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<TaskSpec>,
}

impl TaskCatalog {
    /// Create a catalog. Every [`TaskKind`] must appear exactly once.
    pub fn new(mut tasks: Vec<TaskSpec>) -> Result<Self, ExtractionError> {
        for kind in TaskKind::ALL {
            let count = tasks.iter().filter(|t| t.kind == kind).count();
            if count != 1 {
                return Err(ExtractionError::Catalog(format!(
                    "task {kind} defined {count} times, expected once"
                )));
            }
        }

        tasks.sort_by_key(|t| t.kind);
        Ok(Self { tasks })
    }

    /// The four invoice tasks with the configured models.
    pub fn standard(models: &TaskModelConfig) -> Self {
        Self {
            tasks: vec![
                general(models.model_for(TaskKind::General)),
                supplier_customer(models.model_for(TaskKind::SupplierCustomer)),
                item(models.model_for(TaskKind::Item)),
                total(models.model_for(TaskKind::Total)),
            ],
        }
    }

    /// Tasks in merge order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskSpec> {
        self.tasks.iter()
    }

    /// Look up a task.
    pub fn get(&self, kind: TaskKind) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.kind == kind)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskCatalog {
    fn default() -> Self {
        Self::standard(&TaskModelConfig::default())
    }
}
