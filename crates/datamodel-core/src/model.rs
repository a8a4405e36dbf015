//! The immutable DataModel: shared column store + schema + diffset.
//!
//! Operators never mutate a DataModel. Narrowing operators hand back a model
//! over the same `Arc<ColumnStore>` with a smaller diffset; operators that
//! create values (grouping, joins, sorting) materialize a fresh store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::diffset::{DiffSet, RowDiffsetIter};
use crate::error::{Error, Result};
use crate::schema::{Field, Schema};
use crate::store::{Column, ColumnStore};
use crate::types::Scalar;

static NULL: Scalar = Scalar::Null;

#[derive(Debug, Clone)]
pub struct DataModel {
    store: Arc<ColumnStore>,
    schema: Schema,
    /// Store column index for each schema field, in schema order.
    columns: Arc<[usize]>,
    diffset: DiffSet,
}

impl DataModel {
    /// Assemble a model, checking that every schema field has a column and
    /// that the diffset stays inside the store.
    pub fn from_parts(store: Arc<ColumnStore>, schema: Schema, diffset: DiffSet) -> Result<Self> {
        let columns = schema
            .fields
            .iter()
            .map(|f| {
                store
                    .index_of(&f.name)
                    .ok_or_else(|| Error::unknown_field(f.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        if diffset.upper_bound() > store.len() {
            return Err(Error::Build(format!(
                "diffset reaches row {} but the store holds {}",
                diffset.upper_bound(),
                store.len()
            )));
        }
        Ok(Self {
            store,
            schema,
            columns: Arc::from(columns),
            diffset,
        })
    }

    /// Materialize a fresh store from columns aligned with `schema`; every row is active.
    pub fn from_columns(schema: Schema, values: Vec<Vec<Scalar>>) -> Result<Self> {
        let len = values.first().map(Vec::len).unwrap_or(0);
        Self::from_columns_with_len(schema, values, len)
    }

    /// Like `from_columns` with an explicit row count, which a schema with no
    /// fields needs to keep its rows.
    pub fn from_columns_with_len(
        schema: Schema,
        values: Vec<Vec<Scalar>>,
        len: usize,
    ) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(Error::Build(format!(
                "{} columns supplied for {} fields",
                values.len(),
                schema.len()
            )));
        }
        let columns = schema
            .fields
            .iter()
            .zip(values)
            .map(|(f, v)| Column::new(f.name.clone(), v))
            .collect();
        let store = ColumnStore::with_len(columns, len)?;
        Self::from_parts(Arc::new(store), schema, DiffSet::full(len))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The shared store. Operator implementations use this; readers should
    /// stick to `rows` and `schema`.
    pub fn store(&self) -> &Arc<ColumnStore> {
        &self.store
    }

    pub fn diffset(&self) -> &DiffSet {
        &self.diffset
    }

    /// Number of active rows.
    pub fn len(&self) -> usize {
        self.diffset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffset.is_empty()
    }

    /// Lazy, restartable sequence of active physical row indices, ascending.
    pub fn row_diffset_iterator(&self) -> RowDiffsetIter<'_> {
        self.diffset.iter()
    }

    /// Active rows as views; nothing is copied.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.diffset.iter().map(move |index| Row { model: self, index })
    }

    /// View of physical row `index`.
    pub fn row(&self, index: usize) -> Row<'_> {
        Row { model: self, index }
    }

    /// Physical values for the field at schema position `pos`.
    pub fn column_at(&self, pos: usize) -> &[Scalar] {
        match self.store.column_at(self.columns[pos]) {
            Some(col) => &col.values,
            None => &[],
        }
    }

    /// Physical values for `name`, if it is part of the schema.
    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.schema.index_of(name).map(|pos| self.column_at(pos))
    }

    pub fn value(&self, index: usize, name: &str) -> Option<&Scalar> {
        self.column(name).and_then(|c| c.get(index))
    }

    /// Same store and schema, different active rows.
    pub fn with_diffset(&self, diffset: DiffSet) -> Self {
        debug_assert!(diffset.upper_bound() <= self.store.len());
        Self {
            store: Arc::clone(&self.store),
            schema: self.schema.clone(),
            columns: Arc::clone(&self.columns),
            diffset,
        }
    }

    /// Same store and diffset under a schema whose fields the store holds.
    pub fn with_schema(&self, schema: Schema) -> Result<Self> {
        Self::from_parts(Arc::clone(&self.store), schema, self.diffset.clone())
    }

    /// Same diffset over a derived store, e.g. one with an added column.
    pub fn with_store(&self, store: ColumnStore, schema: Schema) -> Result<Self> {
        Self::from_parts(Arc::new(store), schema, self.diffset.clone())
    }

    /// Copy the schema columns for `indices`, in that order, into a fresh model.
    pub fn gather(&self, indices: &[usize]) -> Result<Self> {
        let values = (0..self.schema.len())
            .map(|pos| {
                let col = self.column_at(pos);
                indices.iter().map(|&i| col[i].clone()).collect()
            })
            .collect();
        Self::from_columns_with_len(self.schema.clone(), values, indices.len())
    }

    /// Materialized export: schema, row-major values and active indices.
    pub fn get_data(&self) -> DataTable {
        let data = self.rows().map(|r| r.to_values()).collect();
        DataTable {
            schema: self.schema.clone(),
            data,
            uids: self.diffset.iter().collect(),
        }
    }

    /// Active rows as JSON objects, keys in schema order.
    pub fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows().map(|r| r.to_json()).collect()
    }
}

/// Resolved view of one physical row: field name → value.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    model: &'a DataModel,
    index: usize,
}

impl<'a> Row<'a> {
    /// Physical row index in the store.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn schema(&self) -> &'a Schema {
        &self.model.schema
    }

    pub fn get(&self, name: &str) -> Option<&'a Scalar> {
        self.model.value(self.index, name)
    }

    /// Like `get`, with `Null` for unknown names.
    pub fn value(&self, name: &str) -> &'a Scalar {
        self.get(name).unwrap_or(&NULL)
    }

    /// Value at schema position `pos`.
    pub fn at(&self, pos: usize) -> &'a Scalar {
        self.model
            .column_at(pos)
            .get(self.index)
            .unwrap_or(&NULL)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'a Field, &'a Scalar)> + 'a {
        let row = *self;
        let model = self.model;
        model
            .schema
            .fields
            .iter()
            .enumerate()
            .map(move |(pos, f)| (f, row.at(pos)))
    }

    pub fn to_values(&self) -> Vec<Scalar> {
        self.fields().map(|(_, v)| v.clone()).collect()
    }

    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields()
            .map(|(f, v)| (f.name.clone(), v.to_json()))
            .collect()
    }
}

/// Finished table handed to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub schema: Schema,
    pub data: Vec<Vec<Scalar>>,
    pub uids: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    fn model() -> DataModel {
        let schema =
            Schema::from_specs(&[FieldSpec::dimension("city"), FieldSpec::measure("sales")])
                .unwrap();
        DataModel::from_columns(
            schema,
            vec![
                vec!["NY".into(), "LA".into(), "SF".into()],
                vec![Scalar::F64(10.0), Scalar::F64(7.0), Scalar::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_resolve_fields_by_name() {
        let m = model();
        let cities: Vec<&Scalar> = m.rows().map(|r| r.value("city")).collect();
        assert_eq!(cities, vec![&Scalar::from("NY"), &Scalar::from("LA"), &Scalar::from("SF")]);
        assert_eq!(m.row(1).get("sales"), Some(&Scalar::F64(7.0)));
        assert_eq!(m.row(1).value("missing"), &Scalar::Null);
    }

    #[test]
    fn narrowed_view_shares_store() {
        let m = model();
        let narrowed = m.with_diffset(DiffSet::from_sorted(vec![0, 2]));
        assert!(Arc::ptr_eq(m.store(), narrowed.store()));
        assert_eq!(narrowed.len(), 2);
        let data = narrowed.get_data();
        assert_eq!(data.uids, vec![0, 2]);
        assert_eq!(data.data[1], vec![Scalar::from("SF"), Scalar::Null]);
    }

    #[test]
    fn from_parts_rejects_out_of_range_diffset() {
        let m = model();
        let err = DataModel::from_parts(
            Arc::clone(m.store()),
            m.schema().clone(),
            DiffSet::from_sorted(vec![0, 3]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Build(_)));
    }

    #[test]
    fn json_rows_follow_schema_order() {
        let rows = model().to_json_rows();
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(rows[0]["sales"], serde_json::json!(10.0));
    }

    #[test]
    fn gather_over_no_fields_keeps_rows() {
        let m = model().with_schema(Schema::new(Vec::new()).unwrap()).unwrap();
        assert_eq!(m.len(), 3);
        let gathered = m.gather(&[2, 0]).unwrap();
        assert_eq!(gathered.len(), 2);
        assert_eq!(gathered.get_data().data, vec![Vec::<Scalar>::new(); 2]);
    }
}
