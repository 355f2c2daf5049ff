use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Field names of an [`ExamRecord`] as they appear on the wire.
pub const EXAM_FIELDS: [&str; 8] = [
    "code",
    "subject",
    "examType",
    "category",
    "semester",
    "date",
    "startTime",
    "endTime",
];

/// Returns true if `name` is one of the wire field names of an exam record.
pub fn is_exam_field(name: &str) -> bool {
    EXAM_FIELDS.contains(&name)
}

/// Kind of assessment. Wire literals are matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "Mid Term")]
    MidTerm,
    #[serde(rename = "End Term")]
    EndTerm,
    #[serde(rename = "CA")]
    Ca,
    #[serde(rename = "Lab")]
    Lab,
    #[serde(rename = "Other")]
    Other,
}

impl ExamType {
    pub const ALL: [ExamType; 5] = [
        ExamType::MidTerm,
        ExamType::EndTerm,
        ExamType::Ca,
        ExamType::Lab,
        ExamType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::MidTerm => "Mid Term",
            ExamType::EndTerm => "End Term",
            ExamType::Ca => "CA",
            ExamType::Lab => "Lab",
            ExamType::Other => "Other",
        }
    }
}

impl FromStr for ExamType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or(())
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the exam is a first attempt or a backlog re-sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Regular,
    Backlog,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Regular, Category::Backlog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Regular => "Regular",
            Category::Backlog => "Backlog",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|c| c.as_str() == s).ok_or(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully specified exam entry, ready for persistence.
///
/// `date` is `YYYY-MM-DD`, `start_time`/`end_time` are `HH:mm` (24h, no zone).
/// The formats are checked syntactically only; calendar validity and
/// `start_time < end_time` are not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub code: String,
    pub subject: String,
    pub exam_type: ExamType,
    pub category: Category,
    pub semester: u32,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// Partial exam data accumulated across conversation turns.
///
/// Keys are always exam field names; merging is last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GatheredFields(BTreeMap<String, Value>);

impl<'de> Deserialize<'de> for GatheredFields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_object(&object))
    }
}

impl GatheredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds gathered fields from an arbitrary JSON object, keeping only
    /// exam field names with a usable value.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut fields = Self::new();
        fields.absorb(object);
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Sets a single field. Unknown field names and empty values are ignored.
    pub fn set(&mut self, key: &str, value: Value) {
        if is_exam_field(key) && has_content(&value) {
            self.0.insert(key.to_string(), value);
        }
    }

    /// Shallow merge, values from `other` overwrite ours.
    pub fn merge(&mut self, other: &GatheredFields) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Shallow merge from a raw JSON object as returned by the model.
    pub fn absorb(&mut self, object: &Map<String, Value>) {
        for (key, value) in object {
            self.set(key, value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// JSON object view, used for prompts and candidate validation.
    pub fn to_object(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Field names that have not been gathered yet, in canonical order.
    pub fn missing(&self) -> Vec<String> {
        EXAM_FIELDS
            .iter()
            .filter(|f| !self.0.contains_key(**f))
            .map(|f| f.to_string())
            .collect()
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// One date being gathered in multi-exam mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDateEntry {
    pub date: String,
    #[serde(default)]
    pub fields: GatheredFields,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub is_confirmed: bool,
}

impl ExamDateEntry {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> GatheredFields {
        GatheredFields::from_object(value.as_object().unwrap())
    }

    #[test]
    fn test_merge_adds_new_keys() {
        let mut gathered = fields(json!({"code": "CS101"}));
        gathered.merge(&fields(json!({"subject": "Data Structures"})));

        assert_eq!(gathered.len(), 2);
        assert_eq!(gathered.get("code"), Some(&json!("CS101")));
        assert_eq!(gathered.get("subject"), Some(&json!("Data Structures")));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut gathered = fields(json!({"semester": 1}));
        gathered.merge(&fields(json!({"semester": 2})));

        assert_eq!(gathered.len(), 1);
        assert_eq!(gathered.get("semester"), Some(&json!(2)));
    }

    #[test]
    fn test_unknown_keys_and_empty_values_are_dropped() {
        let gathered = fields(json!({
            "code": "CS101",
            "room": "B12",
            "subject": "",
            "date": null
        }));

        assert_eq!(gathered.keys().collect::<Vec<_>>(), vec!["code"]);
    }

    #[test]
    fn test_missing_follows_field_order() {
        let gathered = fields(json!({"code": "CS101", "date": "2025-03-10"}));
        assert_eq!(
            gathered.missing(),
            vec!["subject", "examType", "category", "semester", "startTime", "endTime"]
        );
    }

    #[test]
    fn test_exam_record_wire_names() {
        let record = ExamRecord {
            code: "CS101".to_string(),
            subject: "Data Structures".to_string(),
            exam_type: ExamType::MidTerm,
            category: Category::Regular,
            semester: 2,
            date: "2025-03-10".to_string(),
            start_time: "09:00".to_string(),
            end_time: "12:00".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["examType"], json!("Mid Term"));
        assert_eq!(value["category"], json!("Regular"));
        assert_eq!(value["startTime"], json!("09:00"));
        assert_eq!(value["semester"], json!(2));
    }

    #[test]
    fn test_enum_parsing_is_exact() {
        assert_eq!("End Term".parse::<ExamType>(), Ok(ExamType::EndTerm));
        assert!("end term".parse::<ExamType>().is_err());
        assert_eq!("Backlog".parse::<Category>(), Ok(Category::Backlog));
        assert!("backlog".parse::<Category>().is_err());
    }

    #[test]
    fn test_deserialize_filters_fields() {
        let gathered: GatheredFields =
            serde_json::from_value(json!({"code": "MA201", "notes": "bring calculator"})).unwrap();
        assert_eq!(gathered.len(), 1);
        assert!(gathered.contains("code"));
    }

    #[test]
    fn test_exam_date_entry_defaults() {
        let entry: ExamDateEntry = serde_json::from_value(json!({"date": "2025-04-01"})).unwrap();
        assert_eq!(entry, ExamDateEntry::new("2025-04-01"));
        assert!(!entry.is_confirmed);
    }
}
