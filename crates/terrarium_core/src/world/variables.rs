//! Variable access by slot index and by name.
//!
//! Writes to predefined slots are checked and routed through the operation
//! they stand for: setting XCOR moves the turtle, setting BREED changes
//! breed, setting TIE-MODE updates the tie count. User-declared slots take
//! any value.

use super::World;
use crate::drawing::PenMode;
use crate::error::{Result, WorldError};
use crate::link::TieMode;
use crate::schema::{link_var, patch_var, turtle_var, SlotLayout, StaleSlots};
use crate::topology::{wrap, Point};
use terrarium_data::{AgentKind, AgentRef, LinkId, PatchId, TurtleId, Value};

/// Colors are either a number folded into `[0, 140)` or an RGB(A) list.
fn normalize_color(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_finite() => Some(Value::Number(wrap(*n, 0.0, 140.0))),
        Value::List(items)
            if (3..=4).contains(&items.len())
                && items
                    .iter()
                    .all(|v| v.as_number().is_some_and(|c| (0.0..=255.0).contains(&c))) =>
        {
            Some(value.clone())
        }
        _ => None,
    }
}

impl World {
    fn layout_for_turtle(&self, id: TurtleId) -> Result<SlotLayout<'_>> {
        let turtle = self.turtle(id)?;
        Ok(self.agent_layout(AgentKind::Turtle, turtle.breed(), turtle.stale.as_ref()))
    }

    fn layout_for_link(&self, id: LinkId) -> Result<SlotLayout<'_>> {
        let link = self.link(id)?;
        Ok(self.agent_layout(AgentKind::Link, link.breed(), link.stale.as_ref()))
    }

    /// Agents whose breed was dropped by a recompile keep the layout they
    /// had before it.
    fn agent_layout<'a>(
        &'a self,
        kind: AgentKind,
        breed: &str,
        stale: Option<&'a StaleSlots>,
    ) -> SlotLayout<'a> {
        let is_3d = self.is_3d();
        if let Some(stale) = stale {
            return stale.layout(kind, is_3d);
        }
        SlotLayout::resolve(&self.program, kind, breed, is_3d).unwrap_or_else(|| SlotLayout {
            predefined: crate::schema::predefined(kind, is_3d),
            kind_owned: match kind {
                AgentKind::Link => &self.program.links_own,
                _ => &self.program.turtles_own,
            },
            breed_owned: &[],
        })
    }

    fn layout_for_patches(&self) -> SlotLayout<'_> {
        SlotLayout {
            predefined: crate::schema::predefined(AgentKind::Patch, self.is_3d()),
            kind_owned: &self.program.patches_own,
            breed_owned: &[],
        }
    }

    fn out_of_range(&self, agent: AgentRef, index: usize) -> WorldError {
        WorldError::VariableIndexOutOfRange {
            agent: self.describe(agent),
            index,
        }
    }

    fn slot_name(&self, agent: AgentRef, index: usize) -> String {
        let layout = match agent {
            AgentRef::Turtle(id) => self.layout_for_turtle(id).ok(),
            AgentRef::Patch(_) => Some(self.layout_for_patches()),
            AgentRef::Link(id) => self.layout_for_link(id).ok(),
        };
        layout
            .and_then(|l| l.name_at(index).map(str::to_string))
            .unwrap_or_else(|| format!("#{index}"))
    }

    fn type_error(&self, agent: AgentRef, index: usize, expected: &'static str, value: Value) -> WorldError {
        WorldError::wrong_type(self.describe(agent), self.slot_name(agent, index), expected, value)
    }

    fn number(&self, agent: AgentRef, index: usize, value: &Value) -> Result<f64> {
        value
            .as_number()
            .ok_or_else(|| self.type_error(agent, index, "a number", value.clone()))
    }

    fn color(&self, agent: AgentRef, index: usize, value: &Value) -> Result<Value> {
        normalize_color(value)
            .ok_or_else(|| self.type_error(agent, index, "a color", value.clone()))
    }

    fn read_only(&self, agent: AgentRef, index: usize) -> WorldError {
        WorldError::ReadOnlyVariable {
            agent: self.describe(agent),
            variable: self.slot_name(agent, index),
        }
    }

    // ---- turtles ----

    pub fn turtle_variable(&self, id: TurtleId, index: usize) -> Result<Value> {
        self.turtle(id)?
            .slot(index, self.is_3d())
            .ok_or_else(|| self.out_of_range(id.into(), index))
    }

    pub fn set_turtle_variable(&mut self, id: TurtleId, index: usize, value: Value) -> Result<()> {
        let agent = AgentRef::Turtle(id);
        let is_3d = self.is_3d();
        let len = self.turtle(id)?.vars.len();
        match index {
            turtle_var::WHO => Err(self.read_only(agent, index)),
            turtle_var::HEADING => {
                let h = self.number(agent, index, &value)?;
                self.set_heading(id, h)
            }
            turtle_var::XCOR | turtle_var::YCOR => {
                let v = self.number(agent, index, &value)?;
                let p = self.turtle(id)?.position();
                let to = if index == turtle_var::XCOR {
                    Point::new3(v, p.y, p.z)
                } else {
                    Point::new3(p.x, v, p.z)
                };
                self.set_position(id, to)
            }
            turtle_var::ZCOR if is_3d => {
                let z = self.number(agent, index, &value)?;
                let p = self.turtle(id)?.position();
                self.set_position(id, Point::new3(p.x, p.y, z))
            }
            turtle_var::PITCH if is_3d => {
                let v = self.number(agent, index, &value)?;
                self.set_pitch(id, v)
            }
            turtle_var::ROLL if is_3d => {
                let v = self.number(agent, index, &value)?;
                self.set_roll(id, v)
            }
            turtle_var::BREED => match &value {
                Value::Breed(name) if self.turtle_breeds.get(name).is_some() => {
                    self.set_turtle_breed(id, name)
                }
                _ => Err(self.type_error(agent, index, "a turtle breed", value)),
            },
            turtle_var::COLOR | turtle_var::LABEL_COLOR => {
                let c = self.color(agent, index, &value)?;
                self.turtle_mut(id)?.vars[index] = c;
                Ok(())
            }
            turtle_var::HIDDEN => {
                if value.as_bool().is_none() {
                    return Err(self.type_error(agent, index, "true/false", value));
                }
                self.turtle_mut(id)?.vars[index] = value;
                Ok(())
            }
            turtle_var::SIZE | turtle_var::PEN_SIZE => {
                self.number(agent, index, &value)?;
                self.turtle_mut(id)?.vars[index] = value;
                Ok(())
            }
            turtle_var::PEN_MODE => {
                match value.as_text().and_then(|s| s.parse::<PenMode>().ok()) {
                    Some(mode) => self.set_pen_mode(id, mode),
                    None => Err(self.type_error(agent, index, "up, down or erase", value)),
                }
            }
            turtle_var::SHAPE => {
                if value.as_text().is_none() {
                    return Err(self.type_error(agent, index, "a string", value));
                }
                self.turtle_mut(id)?.vars[index] = value;
                Ok(())
            }
            _ if index < len => {
                self.turtle_mut(id)?.vars[index] = value;
                Ok(())
            }
            _ => Err(self.out_of_range(agent, index)),
        }
    }

    /// Index of a variable the turtle owns under its current breed.
    pub fn turtle_variable_index(&self, id: TurtleId, name: &str) -> Result<usize> {
        self.layout_for_turtle(id)?
            .index_of(name)
            .ok_or_else(|| WorldError::not_owned(self.describe(id.into()), name.to_uppercase()))
    }

    pub fn turtle_variable_named(&self, id: TurtleId, name: &str) -> Result<Value> {
        let index = self.turtle_variable_index(id, name)?;
        self.turtle_variable(id, index)
    }

    pub fn set_turtle_variable_named(&mut self, id: TurtleId, name: &str, value: Value) -> Result<()> {
        let index = self.turtle_variable_index(id, name)?;
        self.set_turtle_variable(id, index, value)
    }

    // ---- patches ----

    pub fn patch_variable(&self, id: PatchId, index: usize) -> Result<Value> {
        self.patch_or_err(id)?
            .vars
            .get(index)
            .cloned()
            .ok_or_else(|| self.out_of_range(id.into(), index))
    }

    pub fn set_patch_variable(&mut self, id: PatchId, index: usize, value: Value) -> Result<()> {
        let agent = AgentRef::Patch(id);
        let len = self.patch_or_err(id)?.vars.len();
        let value = match index {
            patch_var::PXCOR | patch_var::PYCOR => return Err(self.read_only(agent, index)),
            patch_var::PZCOR if self.is_3d() => return Err(self.read_only(agent, index)),
            patch_var::PCOLOR | patch_var::PLABEL_COLOR => self.color(agent, index, &value)?,
            _ if index < len => value,
            _ => return Err(self.out_of_range(agent, index)),
        };
        self.patches[id.0].vars[index] = value;
        Ok(())
    }

    pub fn patch_variable_index(&self, id: PatchId, name: &str) -> Result<usize> {
        self.patch_or_err(id)?;
        self.layout_for_patches()
            .index_of(name)
            .ok_or_else(|| WorldError::not_owned(self.describe(id.into()), name.to_uppercase()))
    }

    pub fn patch_variable_named(&self, id: PatchId, name: &str) -> Result<Value> {
        let index = self.patch_variable_index(id, name)?;
        self.patch_variable(id, index)
    }

    pub fn set_patch_variable_named(&mut self, id: PatchId, name: &str, value: Value) -> Result<()> {
        let index = self.patch_variable_index(id, name)?;
        self.set_patch_variable(id, index, value)
    }

    // ---- links ----

    pub fn link_variable(&self, id: LinkId, index: usize) -> Result<Value> {
        self.link(id)?
            .slot(index)
            .ok_or_else(|| self.out_of_range(id.into(), index))
    }

    pub fn set_link_variable(&mut self, id: LinkId, index: usize, value: Value) -> Result<()> {
        let agent = AgentRef::Link(id);
        let len = self.link(id)?.vars.len();
        let value = match index {
            link_var::END1 | link_var::END2 => return Err(self.read_only(agent, index)),
            link_var::BREED => {
                return match &value {
                    Value::Breed(name) if self.link_breeds.get(name).is_some() => {
                        self.set_link_breed(id, name)
                    }
                    _ => Err(self.type_error(agent, index, "a link breed", value)),
                };
            }
            link_var::TIE_MODE => {
                return match value.as_text().and_then(|s| s.parse::<TieMode>().ok()) {
                    Some(mode) => self.set_tie_mode(id, mode),
                    None => Err(self.type_error(agent, index, "none, free or fixed", value)),
                };
            }
            link_var::COLOR | link_var::LABEL_COLOR => self.color(agent, index, &value)?,
            link_var::HIDDEN if value.as_bool().is_none() => {
                return Err(self.type_error(agent, index, "true/false", value));
            }
            link_var::THICKNESS => {
                self.number(agent, index, &value)?;
                value
            }
            link_var::SHAPE if value.as_text().is_none() => {
                return Err(self.type_error(agent, index, "a string", value));
            }
            _ if index < len => value,
            _ => return Err(self.out_of_range(agent, index)),
        };
        if let Some(link) = self.links.get_mut(&id) {
            link.vars[index] = value;
        }
        Ok(())
    }

    pub fn link_variable_index(&self, id: LinkId, name: &str) -> Result<usize> {
        self.layout_for_link(id)?
            .index_of(name)
            .ok_or_else(|| WorldError::not_owned(self.describe(id.into()), name.to_uppercase()))
    }

    pub fn link_variable_named(&self, id: LinkId, name: &str) -> Result<Value> {
        let index = self.link_variable_index(id, name)?;
        self.link_variable(id, index)
    }

    pub fn set_link_variable_named(&mut self, id: LinkId, name: &str, value: Value) -> Result<()> {
        let index = self.link_variable_index(id, name)?;
        self.set_link_variable(id, index, value)
    }

    // ---- any agent ----

    pub fn agent_variable(&self, agent: AgentRef, index: usize) -> Result<Value> {
        match agent {
            AgentRef::Turtle(id) => self.turtle_variable(id, index),
            AgentRef::Patch(id) => self.patch_variable(id, index),
            AgentRef::Link(id) => self.link_variable(id, index),
        }
    }

    pub fn set_agent_variable(&mut self, agent: AgentRef, index: usize, value: Value) -> Result<()> {
        match agent {
            AgentRef::Turtle(id) => self.set_turtle_variable(id, index, value),
            AgentRef::Patch(id) => self.set_patch_variable(id, index, value),
            AgentRef::Link(id) => self.set_link_variable(id, index, value),
        }
    }

    pub fn agent_variable_named(&self, agent: AgentRef, name: &str) -> Result<Value> {
        match agent {
            AgentRef::Turtle(id) => self.turtle_variable_named(id, name),
            AgentRef::Patch(id) => self.patch_variable_named(id, name),
            AgentRef::Link(id) => self.link_variable_named(id, name),
        }
    }

    pub fn set_agent_variable_named(&mut self, agent: AgentRef, name: &str, value: Value) -> Result<()> {
        match agent {
            AgentRef::Turtle(id) => self.set_turtle_variable_named(id, name, value),
            AgentRef::Patch(id) => self.set_patch_variable_named(id, name, value),
            AgentRef::Link(id) => self.set_link_variable_named(id, name, value),
        }
    }

    /// A patch variable seen from a turtle standing on that patch.
    pub fn patch_variable_here(&self, id: TurtleId, name: &str) -> Result<Value> {
        let patch = self.turtle(id)?.patch_here();
        self.patch_variable_named(patch, name)
    }

    /// Narrows an agent reference to a turtle.
    pub fn expect_turtle(&self, agent: AgentRef) -> Result<TurtleId> {
        agent
            .as_turtle()
            .ok_or_else(|| WorldError::wrong_kind(AgentKind::Turtle, agent.kind()))
    }

    pub fn expect_link(&self, agent: AgentRef) -> Result<LinkId> {
        agent
            .as_link()
            .ok_or_else(|| WorldError::wrong_kind(AgentKind::Link, agent.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::topology::Topology;
    use terrarium_data::{BreedDecl, Program};

    fn world() -> World {
        World::new(
            Topology::torus(-3, 3, -3, 3),
            Program::new()
                .turtles_own(["energy"])
                .patches_own(["chemical"])
                .links_own(["weight"])
                .breed(BreedDecl::new("wolves", "wolf").owns(["speed"])),
        )
        .unwrap()
    }

    #[test]
    fn test_color_folds_into_range() {
        let mut w = world();
        let id = w.create_turtle(None).unwrap();
        w.set_turtle_variable(id, turtle_var::COLOR, Value::Number(145.0))
            .unwrap();
        assert_eq!(
            w.turtle_variable(id, turtle_var::COLOR).unwrap(),
            Value::Number(5.0)
        );
        let rgb = Value::List(vec![255.0.into(), 0.0.into(), 0.0.into()]);
        w.set_turtle_variable(id, turtle_var::COLOR, rgb.clone()).unwrap();
        assert_eq!(w.turtle_variable(id, turtle_var::COLOR).unwrap(), rgb);
        assert!(w
            .set_turtle_variable(id, turtle_var::COLOR, Value::from("red"))
            .is_err());
    }

    #[test]
    fn test_setting_xcor_moves_turtle() {
        let mut w = world();
        let id = w.create_turtle(None).unwrap();
        w.set_turtle_variable_named(id, "xcor", Value::Number(2.0)).unwrap();
        assert_eq!(w.turtle(id).unwrap().xcor(), 2.0);
        let patch = w.patch_here(id).unwrap();
        assert_eq!(w.patch(patch).unwrap().pxcor(), 2);
        assert_eq!(
            w.turtle_variable_named(id, "XCOR").unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn test_who_is_read_only() {
        let mut w = world();
        let id = w.create_turtle(None).unwrap();
        let err = w
            .set_turtle_variable(id, turtle_var::WHO, Value::Number(9.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.to_string().contains("WHO"));
    }

    #[test]
    fn test_setting_breed_slot_changes_breed() {
        let mut w = world();
        let id = w.create_turtle(None).unwrap();
        w.set_turtle_variable(id, turtle_var::BREED, Value::Breed("WOLVES".into()))
            .unwrap();
        assert_eq!(w.turtle(id).unwrap().breed(), "WOLVES");
        assert_eq!(w.turtle_variable_named(id, "speed").unwrap(), Value::ZERO);
        assert!(w
            .set_turtle_variable(id, turtle_var::BREED, Value::from("wolves"))
            .is_err());
    }

    #[test]
    fn test_pen_mode_checked() {
        let mut w = world();
        let id = w.create_turtle(None).unwrap();
        w.set_turtle_variable_named(id, "pen-mode", Value::from("down"))
            .unwrap();
        assert_eq!(w.turtle(id).unwrap().pen_mode(), PenMode::Down);
        let err = w
            .set_turtle_variable_named(id, "pen-mode", Value::from("sideways"))
            .unwrap_err();
        assert!(matches!(err, WorldError::WrongTypeForVariable { .. }));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut w = world();
        let id = w.create_turtle(None).unwrap();
        assert!(matches!(
            w.turtle_variable(id, 99),
            Err(WorldError::VariableIndexOutOfRange { index: 99, .. })
        ));
        assert!(w.set_turtle_variable(id, 99, Value::ZERO).is_err());
    }

    #[test]
    fn test_patch_variables() {
        let mut w = world();
        let p = w.patch_at(1.0, -1.0).unwrap();
        assert_eq!(w.patch_variable(p, patch_var::PXCOR).unwrap(), Value::Number(1.0));
        assert!(w.set_patch_variable(p, patch_var::PXCOR, Value::ZERO).is_err());
        w.set_patch_variable_named(p, "chemical", Value::Number(3.5)).unwrap();
        assert_eq!(w.patch_variable_named(p, "CHEMICAL").unwrap(), Value::Number(3.5));
        assert!(matches!(
            w.patch_variable_named(p, "energy"),
            Err(WorldError::VariableNotOwned { .. })
        ));
        let id = w.create_turtle_at(Point::new(1.0, -1.0), None).unwrap();
        assert_eq!(w.patch_variable_here(id, "chemical").unwrap(), Value::Number(3.5));
    }

    #[test]
    fn test_link_variables() {
        let mut w = world();
        let t = w.create_turtles(2, None).unwrap();
        let link = w.create_link(t[0], t[1], None, false).unwrap();
        assert!(w.set_link_variable(link, link_var::END1, Value::ZERO).is_err());
        w.set_link_variable_named(link, "tie-mode", Value::from("free"))
            .unwrap();
        assert_eq!(w.link(link).unwrap().tie_mode(), TieMode::Free);
        w.set_link_variable_named(link, "weight", Value::Number(1.5)).unwrap();
        assert_eq!(
            w.agent_variable_named(link.into(), "weight").unwrap(),
            Value::Number(1.5)
        );
        assert_eq!(
            w.link_variable(link, link_var::END2).unwrap(),
            Value::Agent(AgentRef::Turtle(t[1]))
        );
    }

    #[test]
    fn test_expect_kind_is_invariant_error() {
        let w = world();
        let err = w.expect_turtle(AgentRef::Patch(PatchId(0))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert!(w.expect_link(AgentRef::Link(LinkId(0))).is_ok());
    }
}
