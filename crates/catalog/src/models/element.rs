/// An embedded metadata `(name, value)` pair attached to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub value: String,
}
impl Element {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ElementRow {
    pub(crate) name: String,
    pub(crate) value: String,
}
impl From<ElementRow> for Element {
    fn from(row: ElementRow) -> Self {
        Self {
            name: row.name,
            value: row.value,
        }
    }
}
