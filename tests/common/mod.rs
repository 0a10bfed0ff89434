use terrarium_lib::model::config::AppConfig;
use terrarium_lib::model::topology::{Point, Topology};
use terrarium_lib::model::{Program, TurtleId, World};

type WorldMod = Box<dyn FnOnce(&mut World)>;

#[allow(dead_code)]
pub struct WorldBuilder {
    topology: Topology,
    program: Program,
    turtles: Vec<(Point, Option<String>)>,
    mods: Vec<WorldMod>,
}

#[allow(dead_code)]
impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            topology: Topology::torus(-5, 5, -5, 5),
            program: Program::new(),
            turtles: Vec::new(),
            mods: Vec::new(),
        }
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_program(mut self, program: Program) -> Self {
        self.program = program;
        self
    }

    pub fn with_turtle(mut self, x: f64, y: f64) -> Self {
        self.turtles.push((Point::new(x, y), None));
        self
    }

    pub fn with_breed_turtle(mut self, x: f64, y: f64, breed: &str) -> Self {
        self.turtles.push((Point::new(x, y), Some(breed.to_string())));
        self
    }

    pub fn with<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut World) + 'static,
    {
        self.mods.push(Box::new(modifier));
        self
    }

    pub fn build(self) -> (World, Vec<TurtleId>) {
        let mut world = World::new(self.topology, self.program).unwrap();
        let ids = self
            .turtles
            .into_iter()
            .map(|(at, breed)| world.create_turtle_at(at, breed.as_deref()).unwrap())
            .collect();
        for m in self.mods {
            m(&mut world);
        }
        (world, ids)
    }
}

#[allow(dead_code)]
pub fn run_config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.world.min_pxcor = -8;
    config.world.max_pxcor = 8;
    config.world.min_pycor = -8;
    config.world.max_pycor = 8;
    config.program = Program::new().patches_own(["CHEMICAL"]);
    config.run.seed = Some(seed);
    config.run.initial_turtles = 30;
    config.run.deposit_variable = Some("chemical".to_string());
    config
}

#[allow(dead_code)]
pub fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}
