use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Student {0} is not registered")]
    NotFound(String),
    #[error("Student id must not be empty")]
    EmptyId,
}

/// Reference identity of one student.
#[derive(Clone, Debug, PartialEq)]
pub struct StudentRecord {
    pub name: String,
    pub embedding: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(rename = "studentName")]
    pub student_name: String,
}

/// In-memory store of registered students, keyed by student id.
#[derive(Debug, Default)]
pub struct StudentRegistry {
    students: RwLock<HashMap<String, StudentRecord>>,
}

impl StudentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a student's reference. Returns `true` on replace.
    pub fn register(&self, student_id: &str, record: StudentRecord) -> Result<bool, RegistryError> {
        if student_id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        let replaced = self.write().insert(student_id.to_string(), record).is_some();
        Ok(replaced)
    }

    pub fn get(&self, student_id: &str) -> Option<StudentRecord> {
        self.read().get(student_id).cloned()
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.read().contains_key(student_id)
    }

    pub fn remove(&self, student_id: &str) -> Result<StudentRecord, RegistryError> {
        self.write()
            .remove(student_id)
            .ok_or_else(|| RegistryError::NotFound(student_id.to_string()))
    }

    /// Removes every student, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut students = self.write();
        let count = students.len();
        students.clear();
        count
    }

    /// All students ordered by id.
    pub fn list(&self) -> Vec<StudentSummary> {
        let mut summaries: Vec<_> = self
            .read()
            .iter()
            .map(|(id, record)| StudentSummary {
                student_id: id.clone(),
                student_name: record.name.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        summaries
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StudentRecord>> {
        self.students.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StudentRecord>> {
        self.students.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> StudentRecord {
        StudentRecord {
            name: name.to_string(),
            embedding: vec![1.0, 0.0],
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = StudentRegistry::new();
        assert_eq!(registry.register("42", record("Ada")), Ok(false));
        assert_eq!(registry.get("42").unwrap().name, "Ada");
        assert!(registry.contains("42"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces_existing() {
        let registry = StudentRegistry::new();
        registry.register("42", record("Ada")).unwrap();
        assert_eq!(registry.register("42", record("Grace")), Ok(true));
        assert_eq!(registry.get("42").unwrap().name, "Grace");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let registry = StudentRegistry::new();
        assert_eq!(registry.register("  ", record("Ada")), Err(RegistryError::EmptyId));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let registry = StudentRegistry::new();
        assert_eq!(
            registry.remove("7"),
            Err(RegistryError::NotFound("7".to_string()))
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = StudentRegistry::new();
        registry.register("1", record("A")).unwrap();
        registry.register("2", record("B")).unwrap();
        registry.register("3", record("C")).unwrap();

        assert_eq!(registry.remove("2").unwrap().name, "B");
        assert!(!registry.contains("2"));
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_is_sorted_and_serializes_camel_case() {
        let registry = StudentRegistry::new();
        registry.register("b", record("Bea")).unwrap();
        registry.register("a", record("Al")).unwrap();

        let list = registry.list();
        assert_eq!(list[0].student_id, "a");
        assert_eq!(list[1].student_name, "Bea");

        let value = serde_json::to_value(&list[0]).unwrap();
        assert_eq!(value["studentId"], "a");
        assert_eq!(value["studentName"], "Al");
    }
}
