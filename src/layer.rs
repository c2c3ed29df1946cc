use crate::{Parameters, Result};

/// A model component that owns learnable weights and exposes them as a parameter tree.
pub trait Layer {
    fn name(&self) -> &str;

    /// Builds a composite whose leaves alias this layer's weights.
    ///
    /// Writes through the returned tree land in the layer, the layer stays borrowed for as long
    /// as the tree lives.
    fn parameters(&mut self) -> Result<Parameters<'_>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matrix, ParamErr, ParameterValue, Vector};

    struct Dense {
        name: String,
        dim: (usize, usize),
        weights: Vec<f32>,
        biases: Vec<f32>,
    }

    impl Dense {
        fn new(name: &str, dim: (usize, usize)) -> Self {
            Self {
                name: name.to_string(),
                dim,
                weights: vec![0.; dim.0 * dim.1],
                biases: vec![0.; dim.1],
            }
        }
    }

    impl Layer for Dense {
        fn name(&self) -> &str {
            &self.name
        }

        fn parameters(&mut self) -> Result<Parameters<'_>> {
            let mut params = Parameters::new(self.name.clone());
            params.push(Matrix::new("w", self.dim, self.weights.as_mut_slice())?)?;
            params.push(Vector::new("b", self.biases.as_mut_slice()))?;
            Ok(params)
        }
    }

    #[test]
    fn subparams_alias_the_layers_weights() {
        let mut hidden = Dense::new("hidden", (2, 3));
        let mut output = Dense::new("output", (3, 1));

        {
            let mut model = Parameters::new("model");
            model.add_subparams(0, &mut hidden).unwrap();
            model.add_subparams(1, &mut output).unwrap();

            assert_eq!(model.parameter_count(), 6 + 3 + 3 + 1);
            model.subparams_mut(1, "output").unwrap().fill(0.5);
        }

        assert!(hidden.weights.iter().all(|&v| v == 0.));
        assert_eq!(output.weights, [0.5; 3]);
        assert_eq!(output.biases, [0.5]);
    }

    #[test]
    fn layers_with_the_same_name_collide() {
        let mut a = Dense::new("dense", (1, 1));
        let mut b = Dense::new("dense", (1, 1));

        let mut model = Parameters::new("model");
        model.add_subparams(0, &mut a).unwrap();
        assert!(matches!(
            model.add_subparams(1, &mut b),
            Err(ParamErr::DuplicateName { .. })
        ));
        assert_eq!(model.len(), 1);

        drop(model);
        assert_eq!(Layer::name(&b), "dense");
    }
}
