use serde::{Deserialize, Serialize};

/// A breed declaration: a named subset of turtles or links with its own
/// extra variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedDecl {
    pub name: String,
    pub singular: String,
    #[serde(default)]
    pub owns: Vec<String>,
    /// Only meaningful for link breeds.
    #[serde(default)]
    pub directed: bool,
}

impl BreedDecl {
    #[must_use]
    pub fn new(name: &str, singular: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            singular: singular.to_uppercase(),
            owns: Vec::new(),
            directed: false,
        }
    }

    #[must_use]
    pub fn owns<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.owns = vars.into_iter().map(|v| v.as_ref().to_uppercase()).collect();
        self
    }

    #[must_use]
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }
}

/// The compiled variable schema of a model.
///
/// Names are case-insensitive; [`Program::normalized`] upper-cases them so
/// the world can compare with plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Program {
    pub turtles_own: Vec<String>,
    pub patches_own: Vec<String>,
    pub links_own: Vec<String>,
    pub breeds: Vec<BreedDecl>,
    pub link_breeds: Vec<BreedDecl>,
}

impl Program {
    pub const TURTLES: &'static str = "TURTLES";
    pub const LINKS: &'static str = "LINKS";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn turtles_own<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.turtles_own = upper(vars);
        self
    }

    #[must_use]
    pub fn patches_own<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patches_own = upper(vars);
        self
    }

    #[must_use]
    pub fn links_own<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.links_own = upper(vars);
        self
    }

    #[must_use]
    pub fn breed(mut self, decl: BreedDecl) -> Self {
        self.breeds.push(decl);
        self
    }

    #[must_use]
    pub fn link_breed(mut self, decl: BreedDecl) -> Self {
        self.link_breeds.push(decl);
        self
    }

    /// Upper-cases every name. Programs loaded from config files go through
    /// this before reaching the world.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.turtles_own,
            &mut self.patches_own,
            &mut self.links_own,
        ] {
            for name in list.iter_mut() {
                *name = name.to_uppercase();
            }
        }
        for decl in self.breeds.iter_mut().chain(self.link_breeds.iter_mut()) {
            decl.name = decl.name.to_uppercase();
            decl.singular = decl.singular.to_uppercase();
            for name in decl.owns.iter_mut() {
                *name = name.to_uppercase();
            }
        }
        self
    }

    #[must_use]
    pub fn turtle_breed(&self, name: &str) -> Option<&BreedDecl> {
        self.breeds.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn link_breed_decl(&self, name: &str) -> Option<&BreedDecl> {
        self.link_breeds
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// Extra variables owned by a turtle breed; empty for the universal set.
    #[must_use]
    pub fn turtle_breed_owns(&self, breed: &str) -> Option<&[String]> {
        if breed.eq_ignore_ascii_case(Self::TURTLES) {
            return Some(&[]);
        }
        self.turtle_breed(breed).map(|b| b.owns.as_slice())
    }

    #[must_use]
    pub fn link_breed_owns(&self, breed: &str) -> Option<&[String]> {
        if breed.eq_ignore_ascii_case(Self::LINKS) {
            return Some(&[]);
        }
        self.link_breed_decl(breed).map(|b| b.owns.as_slice())
    }
}

fn upper<I, S>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    vars.into_iter().map(|v| v.as_ref().to_uppercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_uppercases_names() {
        let program = Program::new()
            .turtles_own(["energy"])
            .breed(BreedDecl::new("wolves", "wolf").owns(["speed"]));
        assert_eq!(program.turtles_own, vec!["ENERGY"]);
        assert_eq!(program.breeds[0].name, "WOLVES");
        assert_eq!(program.breeds[0].owns, vec!["SPEED"]);
    }

    #[test]
    fn test_breed_owns_lookup() {
        let program = Program::new().breed(BreedDecl::new("sheep", "a-sheep").owns(["wool"]));
        assert_eq!(program.turtle_breed_owns("turtles"), Some(&[][..]));
        assert_eq!(
            program.turtle_breed_owns("Sheep").map(|o| o.len()),
            Some(1)
        );
        assert!(program.turtle_breed_owns("wolves").is_none());
    }

    #[test]
    fn test_loaded_program_normalizes() {
        let parsed: Program = serde_json::from_value(serde_json::json!({
            "turtles_own": ["energy"],
            "breeds": [{ "name": "wolves", "singular": "wolf", "owns": ["speed"] }]
        }))
        .unwrap();
        let normalized = parsed.normalized();
        assert_eq!(normalized.turtles_own, vec!["ENERGY"]);
        assert_eq!(normalized.breeds[0].singular, "WOLF");
    }
}
