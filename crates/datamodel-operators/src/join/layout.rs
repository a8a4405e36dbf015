//! Output schema of a join and where each output column comes from.

use datamodel_core::prelude::{Error, Field, Result, Schema};

use super::JoinOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Left(usize),
    Right(usize),
    /// A same-named key: the left value when the left row exists, else the right.
    Coalesce(usize, usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) schema: Schema,
    pub(crate) sources: Vec<Source>,
}

/// Left fields then right fields. Key pairs sharing a name collapse into one
/// column; any other shared name must be aliased away.
pub(crate) fn layout(
    left: &Schema,
    right: &Schema,
    keys: &[(usize, usize)],
    options: &JoinOptions,
) -> Result<Layout> {
    let merged_right = |rp: usize| {
        keys.iter()
            .any(|&(lp, kp)| kp == rp && left.fields[lp].name == right.fields[rp].name)
    };
    let merged_left = |lp: usize| {
        keys.iter()
            .find(|&&(kp, rp)| kp == lp && left.fields[lp].name == right.fields[rp].name)
            .map(|&(_, rp)| rp)
    };

    let right_emitted: Vec<usize> = (0..right.len()).filter(|&rp| !merged_right(rp)).collect();

    let collides = |name: &str| {
        left.contains(name) && right_emitted.iter().any(|&rp| right.fields[rp].name == name)
    };

    let mut fields = Vec::with_capacity(left.len() + right_emitted.len());
    let mut sources = Vec::with_capacity(fields.capacity());

    for (lp, field) in left.fields.iter().enumerate() {
        if let Some(rp) = merged_left(lp) {
            fields.push(field.clone());
            sources.push(Source::Coalesce(lp, rp));
            continue;
        }
        let field = if collides(&field.name) {
            match (&options.left_alias, &options.right_alias) {
                (None, None) => return Err(Error::FieldCollision(field.name.clone())),
                (Some(alias), _) => aliased(field, alias),
                (None, Some(_)) => field.clone(),
            }
        } else {
            field.clone()
        };
        fields.push(field);
        sources.push(Source::Left(lp));
    }

    for &rp in &right_emitted {
        let field = &right.fields[rp];
        let field = match &options.right_alias {
            Some(alias) if collides(&field.name) => aliased(field, alias),
            _ => field.clone(),
        };
        fields.push(field);
        sources.push(Source::Right(rp));
    }

    Ok(Layout {
        schema: Schema::new(fields)?,
        sources,
    })
}

fn aliased(field: &Field, alias: &str) -> Field {
    field.renamed(format!("{alias}.{}", field.name))
}
