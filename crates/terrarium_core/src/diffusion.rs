use crate::error::{Result, WorldError};
use crate::schema::{patch_var, SlotLayout};
use crate::topology::Neighborhood;
use crate::world::World;
use rayon::prelude::*;
use terrarium_data::{AgentKind, PatchId, Value};

/// One diffusion step over a snapshot.
///
/// Every patch keeps `1 - fraction` of its value and hands `fraction` out in
/// equal shares to the neighbors it actually has. A patch with no neighbors
/// keeps everything. The result depends only on `values`, never on the
/// order patches are visited.
fn gather(values: &[f64], neighbors: &[&[PatchId]], fraction: f64) -> Vec<f64> {
    values
        .par_iter()
        .enumerate()
        .map(|(i, &own)| {
            let kept = if neighbors[i].is_empty() {
                own
            } else {
                own * (1.0 - fraction)
            };
            neighbors[i].iter().fold(kept, |acc, n| {
                acc + values[n.0] * fraction / neighbors[n.0].len() as f64
            })
        })
        .collect()
}

impl World {
    /// Shares `fraction` of a patch variable with the eight (26 in 3D)
    /// surrounding patches.
    pub fn diffuse(&mut self, variable: usize, fraction: f64) -> Result<()> {
        self.diffuse_with(variable, fraction, Neighborhood::Moore)
    }

    /// Shares `fraction` of a patch variable with the four (six in 3D)
    /// face-adjacent patches.
    pub fn diffuse4(&mut self, variable: usize, fraction: f64) -> Result<()> {
        self.diffuse_with(variable, fraction, Neighborhood::Cardinal)
    }

    pub fn diffuse_named(&mut self, variable: &str, fraction: f64) -> Result<()> {
        let index = self.patch_variable_index(PatchId(0), variable)?;
        self.diffuse(index, fraction)
    }

    pub fn diffuse4_named(&mut self, variable: &str, fraction: f64) -> Result<()> {
        let index = self.patch_variable_index(PatchId(0), variable)?;
        self.diffuse4(index, fraction)
    }

    fn diffuse_with(&mut self, variable: usize, fraction: f64, kind: Neighborhood) -> Result<()> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(WorldError::InvalidDiffusionRate(fraction));
        }
        let layout = SlotLayout::resolve(&self.program, AgentKind::Patch, "", self.is_3d());
        let name = layout
            .and_then(|l| l.name_at(variable).map(str::to_string))
            .ok_or_else(|| WorldError::VariableIndexOutOfRange {
                agent: "patches".to_string(),
                index: variable,
            })?;
        let fixed = variable == patch_var::PXCOR
            || variable == patch_var::PYCOR
            || (self.is_3d() && variable == patch_var::PZCOR);
        if fixed {
            return Err(WorldError::ReadOnlyVariable {
                agent: "patches".to_string(),
                variable: name,
            });
        }

        let values = self
            .patches
            .iter()
            .map(|p| match p.vars.get(variable) {
                Some(Value::Number(n)) => Ok(*n),
                other => Err(WorldError::NonNumericPatchValue {
                    variable: name.clone(),
                    pxcor: p.pxcor(),
                    pycor: p.pycor(),
                    value: other.cloned().unwrap_or_default(),
                }),
            })
            .collect::<Result<Vec<f64>>>()?;

        let next = {
            let neighbors: Vec<&[PatchId]> = (0..values.len())
                .map(|i| match kind {
                    Neighborhood::Moore => self.neighbors(PatchId(i)),
                    Neighborhood::Cardinal => self.neighbors4(PatchId(i)),
                })
                .collect();
            gather(&values, &neighbors, fraction)
        };

        for (patch, value) in self.patches.iter_mut().zip(next) {
            patch.vars[variable] = Value::Number(value);
        }
        self.metrics.record_diffusion();
        tracing::trace!(variable = %name, fraction, neighbors = ?kind, "Diffused");
        Ok(())
    }
}
