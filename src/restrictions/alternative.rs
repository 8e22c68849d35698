//! Search for the next viable option of a rejected part.
//!
//! The search walks a per-solve working copy of the catalog. Rejected colors
//! are struck from that copy so a single solve can never offer the same
//! option twice, which is what bounds the solver.

use tracing::trace;

use crate::config::{OptionalParts, PartOption};
use crate::parts::Part;

/// Per-solve copy of the catalog that alternatives are drawn from.
#[derive(Debug, Clone)]
pub struct WorkingCatalog {
    options: Vec<PartOption>,
}

impl WorkingCatalog {
    pub fn new(options: Vec<PartOption>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &[PartOption] {
        &self.options
    }
}

/// Finds alternatives for rejected parts.
pub struct AlternativeFinder<'a> {
    optionals: &'a OptionalParts,
}

impl<'a> AlternativeFinder<'a> {
    pub fn new(optionals: &'a OptionalParts) -> Self {
        Self { optionals }
    }

    /// Next option for `rejected`, cycling deterministically.
    ///
    /// Colors after the rejected one in the same material come first
    /// (wrapping), then the first color of each following material (wrapping
    /// over the material list). With `strike` set the rejected color is
    /// removed from the working catalog before searching.
    ///
    /// When nothing is left the part is dropped if optional (an empty part
    /// is returned) and `None` is returned otherwise.
    pub fn alternative_for(
        &self,
        rejected: &Part,
        catalog: &mut WorkingCatalog,
        strike: bool,
    ) -> Option<Part> {
        let found = catalog
            .options
            .iter_mut()
            .find(|option| option.name == rejected.name)
            .and_then(|option| next_option(option, rejected, strike));

        if let Some((material, color)) = found {
            trace!(
                "Alternative for {} ({:?}/{:?}): {}/{}",
                rejected.name,
                rejected.material,
                rejected.color,
                material,
                color
            );
            return Some(Part::new(rejected.name.clone(), material, color));
        }

        if self.optionals.contains(&rejected.name) {
            trace!("No alternative for optional part {}, dropping it", rejected.name);
            return Some(Part::empty(rejected.name.clone()));
        }

        None
    }
}

fn next_option(option: &mut PartOption, rejected: &Part, strike: bool) -> Option<(String, String)> {
    let count = option.materials.len();
    if count == 0 {
        return None;
    }

    let start = rejected
        .material
        .as_deref()
        .and_then(|m| option.materials.iter().position(|material| material.name == m));

    // A material missing from the catalog has no position to cycle from.
    let start = start?;

    let rejected_color = rejected.color.as_deref();
    let material = &mut option.materials[start];
    let position = rejected_color.and_then(|c| material.colors.iter().position(|color| color == c));

    let same_material: Option<String> = match position {
        Some(index) if strike => {
            material.colors.remove(index);
            let (head, tail) = material.colors.split_at(index);
            tail.iter().chain(head).next().cloned()
        }
        Some(index) => {
            let (head, tail) = material.colors.split_at(index + 1);
            tail.iter()
                .chain(head)
                .find(|color| Some(color.as_str()) != rejected_color)
                .cloned()
        }
        None => material
            .colors
            .iter()
            .find(|color| Some(color.as_str()) != rejected_color)
            .cloned(),
    };

    if let Some(color) = same_material {
        return Some((material.name.clone(), color));
    }

    (1..count)
        .map(|step| &option.materials[(start + step) % count])
        .find_map(|material| Some((material.name.clone(), material.colors.first()?.clone())))
}
