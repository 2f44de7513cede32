//! Capacity-bounded tables and the label/function symbol tables.

use serde::{Deserialize, Serialize};
use std::ops::Index;
use thiserror::Error;

/// A table reached its configured maximum
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{table} table is full (capacity: {max})")]
pub struct TableFull {
    pub table: &'static str,
    pub max: usize,
}

/// Append-only vector with a hard capacity.
///
/// Pushing past the capacity fails and leaves the contents untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedVec<T> {
    table: &'static str,
    items: Vec<T>,
    max: usize,
}

impl<T> BoundedVec<T> {
    pub fn new(table: &'static str, max: usize) -> Self {
        Self {
            table,
            items: Vec::new(),
            max,
        }
    }

    /// Append `item`, returning its index.
    pub fn try_push(&mut self, item: T) -> Result<usize, TableFull> {
        if self.is_full() {
            return Err(TableFull {
                table: self.table,
                max: self.max,
            });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max
    }

    pub fn capacity(&self) -> usize {
        self.max
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Index<usize> for BoundedVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

/// A label, scoped to the function it was declared in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Index of the instruction following the label
    pub index: usize,
    /// Index of the owning function
    pub function: usize,
}

/// A script function covering instructions `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl Function {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Label and function tables of one program
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    labels: BoundedVec<Label>,
    functions: BoundedVec<Function>,
}

impl SymbolTable {
    pub fn new(max_labels: usize, max_functions: usize) -> Self {
        Self {
            labels: BoundedVec::new("label", max_labels),
            functions: BoundedVec::new("function", max_functions),
        }
    }

    pub fn labels(&self) -> &[Label] {
        self.labels.as_slice()
    }

    pub fn functions(&self) -> &[Function] {
        self.functions.as_slice()
    }

    pub fn add_label(&mut self, label: Label) -> Result<usize, TableFull> {
        self.labels.try_push(label)
    }

    pub fn add_function(&mut self, function: Function) -> Result<usize, TableFull> {
        self.functions.try_push(function)
    }

    pub fn function_mut(&mut self, index: usize) -> Option<&mut Function> {
        self.functions.as_mut_slice().get_mut(index)
    }

    pub fn labels_full(&self) -> bool {
        self.labels.is_full()
    }

    pub fn functions_full(&self) -> bool {
        self.functions.is_full()
    }

    /// First label named `name` owned by `function`
    pub fn find_label(&self, function: usize, name: &str) -> Option<&Label> {
        self.labels
            .iter()
            .find(|label| label.function == function && label.name == name)
    }

    /// Index of the first function named `name`
    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|func| func.name == name)
    }
}
