// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// LSTM layer with ReLU cell and output activations
///
/// Gates keep the usual sigmoid. The candidate cell state and the hidden output use
/// ReLU instead of tanh, which lets the layer represent prices above the top of the
/// scaled training range.
#[derive(Module, Debug)]
pub struct ReluLstm<B: Backend> {
    input_size: usize,
    hidden_size: usize,

    // Input projections
    input_gate: Linear<B>,
    forget_gate: Linear<B>,
    cell_gate: Linear<B>,
    output_gate: Linear<B>,

    // Recurrent projections
    input_recurrent: Linear<B>,
    forget_recurrent: Linear<B>,
    cell_recurrent: Linear<B>,
    output_recurrent: Linear<B>,
}

impl<B: Backend> ReluLstm<B> {
    /// Create a new LSTM layer
    ///
    /// # Arguments
    ///
    /// * `input_size` - Features per time step (the window length here)
    /// * `hidden_size` - Size of the hidden state
    /// * `device` - Device to place tensors on
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let input_projection =
            || -> Linear<B> { LinearConfig::new(input_size, hidden_size).init(device) };
        let recurrent_projection =
            || -> Linear<B> { LinearConfig::new(hidden_size, hidden_size).init(device) };

        Self {
            input_size,
            hidden_size,
            input_gate: input_projection(),
            forget_gate: input_projection(),
            cell_gate: input_projection(),
            output_gate: input_projection(),
            input_recurrent: recurrent_projection(),
            forget_recurrent: recurrent_projection(),
            cell_recurrent: recurrent_projection(),
            output_recurrent: recurrent_projection(),
        }
    }

    /// Forward pass over a sequence
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape [batch_size, sequence_length, input_size]
    ///
    /// # Returns
    ///
    /// The final hidden state, shape [batch_size, hidden_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let device = x.device();
        let [batch_size, sequence_length, _] = x.dims();

        let mut h = Tensor::zeros([batch_size, self.hidden_size], &device);
        let mut c = Tensor::zeros([batch_size, self.hidden_size], &device);

        for t in 0..sequence_length {
            // [batch_size, input_size]
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            let i_t = activation::sigmoid(
                self.input_gate.forward(x_t.clone()) + self.input_recurrent.forward(h.clone()),
            );
            let f_t = activation::sigmoid(
                self.forget_gate.forward(x_t.clone()) + self.forget_recurrent.forward(h.clone()),
            );
            let g_t = activation::relu(
                self.cell_gate.forward(x_t.clone()) + self.cell_recurrent.forward(h.clone()),
            );
            let o_t = activation::sigmoid(
                self.output_gate.forward(x_t) + self.output_recurrent.forward(h.clone()),
            );

            c = f_t * c + i_t * g_t;
            h = o_t * activation::relu(c.clone());
        }

        h
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
