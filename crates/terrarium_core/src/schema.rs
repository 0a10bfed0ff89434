//! Agent variable layouts and their migration.
//!
//! Every agent stores its variables in one flat slot array laid out as
//! `[predefined | kind-owned | breed-owned]`. The predefined block is fixed
//! per agent kind and dimensionality. The two owned blocks come from the
//! compiled [`Program`] and change when the program is recompiled or when an
//! agent changes breed. [`realloc`] moves values from one layout to another
//! by name so live data survives those changes.

use terrarium_data::{AgentKind, Program, Value};

pub const TURTLE_VARIABLES: [&str; 13] = [
    "WHO",
    "COLOR",
    "HEADING",
    "XCOR",
    "YCOR",
    "SHAPE",
    "LABEL",
    "LABEL-COLOR",
    "BREED",
    "HIDDEN?",
    "SIZE",
    "PEN-SIZE",
    "PEN-MODE",
];

pub const TURTLE_VARIABLES_3D: [&str; 16] = [
    "WHO",
    "COLOR",
    "HEADING",
    "XCOR",
    "YCOR",
    "SHAPE",
    "LABEL",
    "LABEL-COLOR",
    "BREED",
    "HIDDEN?",
    "SIZE",
    "PEN-SIZE",
    "PEN-MODE",
    "ZCOR",
    "PITCH",
    "ROLL",
];

pub const PATCH_VARIABLES: [&str; 5] = ["PXCOR", "PYCOR", "PCOLOR", "PLABEL", "PLABEL-COLOR"];

pub const PATCH_VARIABLES_3D: [&str; 6] = [
    "PXCOR",
    "PYCOR",
    "PCOLOR",
    "PLABEL",
    "PLABEL-COLOR",
    "PZCOR",
];

pub const LINK_VARIABLES: [&str; 10] = [
    "END1",
    "END2",
    "COLOR",
    "LABEL",
    "LABEL-COLOR",
    "HIDDEN?",
    "BREED",
    "THICKNESS",
    "SHAPE",
    "TIE-MODE",
];

/// Slot indices of predefined turtle variables.
pub mod turtle_var {
    pub const WHO: usize = 0;
    pub const COLOR: usize = 1;
    pub const HEADING: usize = 2;
    pub const XCOR: usize = 3;
    pub const YCOR: usize = 4;
    pub const SHAPE: usize = 5;
    pub const LABEL: usize = 6;
    pub const LABEL_COLOR: usize = 7;
    pub const BREED: usize = 8;
    pub const HIDDEN: usize = 9;
    pub const SIZE: usize = 10;
    pub const PEN_SIZE: usize = 11;
    pub const PEN_MODE: usize = 12;
    pub const ZCOR: usize = 13;
    pub const PITCH: usize = 14;
    pub const ROLL: usize = 15;
}

/// Slot indices of predefined patch variables.
pub mod patch_var {
    pub const PXCOR: usize = 0;
    pub const PYCOR: usize = 1;
    pub const PCOLOR: usize = 2;
    pub const PLABEL: usize = 3;
    pub const PLABEL_COLOR: usize = 4;
    pub const PZCOR: usize = 5;
}

/// Slot indices of predefined link variables.
pub mod link_var {
    pub const END1: usize = 0;
    pub const END2: usize = 1;
    pub const COLOR: usize = 2;
    pub const LABEL: usize = 3;
    pub const LABEL_COLOR: usize = 4;
    pub const HIDDEN: usize = 5;
    pub const BREED: usize = 6;
    pub const THICKNESS: usize = 7;
    pub const SHAPE: usize = 8;
    pub const TIE_MODE: usize = 9;
}

/// Names of the predefined slots for a kind of agent.
#[must_use]
pub fn predefined(kind: AgentKind, is_3d: bool) -> &'static [&'static str] {
    match (kind, is_3d) {
        (AgentKind::Turtle, false) => &TURTLE_VARIABLES,
        (AgentKind::Turtle, true) => &TURTLE_VARIABLES_3D,
        (AgentKind::Patch, false) => &PATCH_VARIABLES,
        (AgentKind::Patch, true) => &PATCH_VARIABLES_3D,
        (AgentKind::Link, _) => &LINK_VARIABLES,
    }
}

/// The slot layout of one concrete agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout<'a> {
    pub predefined: &'static [&'static str],
    pub kind_owned: &'a [String],
    pub breed_owned: &'a [String],
}

impl<'a> SlotLayout<'a> {
    /// Layout of an agent of `kind` in `breed` under `program`.
    ///
    /// Returns `None` when the program does not declare the breed. Patches
    /// ignore `breed`.
    #[must_use]
    pub fn resolve(
        program: &'a Program,
        kind: AgentKind,
        breed: &str,
        is_3d: bool,
    ) -> Option<Self> {
        let (kind_owned, breed_owned): (&[String], &[String]) = match kind {
            AgentKind::Turtle => (&program.turtles_own, program.turtle_breed_owns(breed)?),
            AgentKind::Patch => (&program.patches_own, &[]),
            AgentKind::Link => (&program.links_own, program.link_breed_owns(breed)?),
        };
        Some(Self {
            predefined: predefined(kind, is_3d),
            kind_owned,
            breed_owned,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predefined.len() + self.kind_owned.len() + self.breed_owned.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot index of a variable name, case-insensitive.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names().position(|n| n.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names().nth(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predefined
            .iter()
            .copied()
            .chain(self.kind_owned.iter().map(String::as_str))
            .chain(self.breed_owned.iter().map(String::as_str))
    }

    fn kind_owned_start(&self) -> usize {
        self.predefined.len()
    }

    fn breed_owned_start(&self) -> usize {
        self.predefined.len() + self.kind_owned.len()
    }
}

/// Owned-slot names an agent was laid out with when a recompile dropped its
/// breed. The agent's values stay in these slots until it joins a breed the
/// program declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleSlots {
    kind_owned: Vec<String>,
    breed_owned: Vec<String>,
}

impl StaleSlots {
    #[must_use]
    pub fn capture(layout: &SlotLayout<'_>) -> Self {
        Self {
            kind_owned: layout.kind_owned.to_vec(),
            breed_owned: layout.breed_owned.to_vec(),
        }
    }

    #[must_use]
    pub fn layout(&self, kind: AgentKind, is_3d: bool) -> SlotLayout<'_> {
        SlotLayout {
            predefined: predefined(kind, is_3d),
            kind_owned: &self.kind_owned,
            breed_owned: &self.breed_owned,
        }
    }
}

/// Moves `vars` from layout `old` to layout `new`.
///
/// Predefined slots are copied by position. Owned slots are matched by
/// name: a kind-owned name is looked up among the old kind-owned names, a
/// breed-owned name among the old breed-owned names. Each old slot is
/// consumed at most once. New names with no old counterpart start at
/// [`Value::ZERO`].
#[must_use]
pub fn realloc(vars: Vec<Value>, old: &SlotLayout<'_>, new: &SlotLayout<'_>) -> Vec<Value> {
    let mut source: Vec<Option<Value>> = vars.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(new.len());

    let shared = old.predefined.len().min(new.predefined.len());
    for slot in source.iter_mut().take(shared) {
        out.push(slot.take().unwrap_or(Value::ZERO));
    }
    out.resize(new.predefined.len(), Value::ZERO);

    let mut take = |names: &[String], start: usize, name: &str| -> Value {
        names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|i| source.get_mut(start + i))
            .and_then(Option::take)
            .unwrap_or(Value::ZERO)
    };

    for name in new.kind_owned {
        out.push(take(old.kind_owned, old.kind_owned_start(), name));
    }
    for name in new.breed_owned {
        out.push(take(old.breed_owned, old.breed_owned_start(), name));
    }
    out
}
