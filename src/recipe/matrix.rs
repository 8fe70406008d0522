// src/recipe/matrix.rs

use std::collections::BTreeMap;

use crate::recipe::Env;

/// Environment matrix from the `[env_matrix]` config section.
///
/// ```toml
/// [env_matrix]
/// CONDA_PY = ["38", "39"]
/// CONDA_R = ["4.1"]
/// ```
///
/// expands to two environments, one per `CONDA_PY` value.
#[derive(Debug, Clone, Default)]
pub struct EnvMatrix {
    axes: BTreeMap<String, Vec<String>>,
}

impl EnvMatrix {
    pub fn new(axes: BTreeMap<String, Vec<String>>) -> Self {
        Self { axes }
    }

    /// Cartesian product of all axes, in key order with the first key varying
    /// slowest. An empty matrix yields a single empty environment.
    pub fn expand(&self) -> Vec<Env> {
        let mut envs = vec![Env::new()];
        for (key, values) in &self.axes {
            envs = envs
                .into_iter()
                .flat_map(|env| {
                    values.iter().map(move |value| {
                        let mut next = env.clone();
                        next.insert(key.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }
        envs
    }
}
