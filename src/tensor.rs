//! A forward-only tensor backed by ndarray.
//!
//! Gradient computation is intentionally absent: the model only specifies the
//! forward graph, and training is expected to happen through an external
//! autodiff facility that mutates the parameter buffers exposed by
//! [`crate::nn::Module::parameters`].

use ndarray::{concatenate, s, Array, ArrayD, Axis, Ix2, Ix3, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::rc::Rc;

/// A smart pointer to a shared float buffer.
///
/// Cloning a `Tensor` is cheap as it only copies the `Rc` pointer; this is how
/// modules hand out parameter handles without copying weights. All forward
/// operations read the buffer and allocate a fresh output, so buffers observed
/// by a forward pass are never written.
#[derive(Debug, Clone)]
pub struct Tensor {
    inner: Rc<RefCell<ArrayD<f32>>>,
}

impl Tensor {
    /// Creates a new tensor from raw data and a shape.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let array = Array::from_shape_vec(IxDyn(&shape), data)
            .unwrap_or_else(|e| panic!("Data size does not match shape: {}", e));
        Self::from_data(array)
    }

    /// Creates a tensor from an existing `ndarray::ArrayD`.
    pub fn from_data(data: ArrayD<f32>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(data)),
        }
    }

    /// Creates a new tensor of zeros with the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::from_data(Array::zeros(IxDyn(&shape)))
    }

    /// Creates a new tensor of ones with the given shape.
    pub fn ones(shape: Vec<usize>) -> Self {
        Self::from_data(Array::ones(IxDyn(&shape)))
    }

    /// Creates a tensor with values drawn uniformly from `[lo, hi)`.
    ///
    /// All weight initialization goes through this with a caller-owned seeded
    /// RNG, so a model built twice from the same seed is bit-identical.
    pub fn uniform(shape: Vec<usize>, lo: f32, hi: f32, rng: &mut StdRng) -> Self {
        let num_elements: usize = shape.iter().product();
        let dist = Uniform::new(lo, hi);
        let data: Vec<f32> = (0..num_elements).map(|_| dist.sample(rng)).collect();
        Self::new(data, shape)
    }

    // --- Accessors ---

    /// Returns the shape of the tensor as an owned vector.
    pub fn shape(&self) -> Vec<usize> {
        self.inner.borrow().shape().to_vec()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn data(&self) -> Ref<'_, ArrayD<f32>> {
        self.inner.borrow()
    }

    /// Mutable access to the underlying buffer. This is the seam through
    /// which an external training procedure updates parameters; the forward
    /// pass itself never calls it.
    pub fn data_mut(&self) -> RefMut<'_, ArrayD<f32>> {
        self.inner.borrow_mut()
    }

    // --- Shape operations ---

    /// Reshapes the tensor, copying if the data is not contiguous.
    pub fn reshape(&self, new_shape: Vec<usize>) -> Tensor {
        let original_shape = self.shape();
        let reshaped = self
            .data()
            .as_standard_layout()
            .into_owned()
            .into_shape(IxDyn(&new_shape))
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to reshape tensor from {:?} to {:?}: {}",
                    original_shape, new_shape, e
                )
            });
        Tensor::from_data(reshaped)
    }

    /// Swaps two axes of the tensor.
    pub fn transpose(&self, axis1: usize, axis2: usize) -> Tensor {
        let data = self.data();
        let mut view = data.view();
        view.swap_axes(axis1, axis2);
        Tensor::from_data(view.to_owned())
    }

    /// Selects one index along an axis, removing that axis.
    /// `select(1, 0)` on a `(B, T, D)` tensor yields `(B, D)`.
    pub fn select(&self, axis: usize, index: usize) -> Tensor {
        Tensor::from_data(self.data().index_axis(Axis(axis), index).to_owned())
    }

    /// Concatenates tensors along an existing axis.
    pub fn concat(tensors: &[&Tensor], axis: usize) -> Tensor {
        let borrowed: Vec<_> = tensors.iter().map(|t| t.data()).collect();
        let views: Vec<_> = borrowed.iter().map(|d| d.view()).collect();
        let out = concatenate(Axis(axis), &views)
            .unwrap_or_else(|e| panic!("Failed to concatenate tensors: {}", e));
        Tensor::from_data(out)
    }

    /// Broadcasts the tensor to a larger shape, materializing the result.
    /// Used to expand `(1, 1, D)` parameters across a batch.
    pub fn broadcast_to(&self, shape: Vec<usize>) -> Tensor {
        let data = self.data();
        let out = data.broadcast(IxDyn(&shape)).unwrap_or_else(|| {
            panic!(
                "Cannot broadcast tensor of shape {:?} to {:?}",
                data.shape(),
                shape
            )
        });
        Tensor::from_data(out.to_owned())
    }

    // --- Reductions ---

    /// Sums elements of the tensor along an axis.
    pub fn sum_axis(&self, axis: usize, keep_dims: bool) -> Tensor {
        let ax = Axis(axis);
        let summed = self.data().sum_axis(ax);
        let out = if keep_dims { summed.insert_axis(ax) } else { summed };
        Tensor::from_data(out)
    }

    /// Mean of elements along an axis.
    pub fn mean_axis(&self, axis: usize, keep_dims: bool) -> Tensor {
        let ax = Axis(axis);
        let mean = self
            .data()
            .mean_axis(ax)
            .unwrap_or_else(|| panic!("Cannot take mean over empty axis {}", axis));
        let out = if keep_dims { mean.insert_axis(ax) } else { mean };
        Tensor::from_data(out)
    }

    /// Population variance of elements along an axis.
    pub fn var_axis(&self, axis: usize, keep_dims: bool) -> Tensor {
        let ax = Axis(axis);
        let var = self.data().var_axis(ax, 0.0);
        let out = if keep_dims { var.insert_axis(ax) } else { var };
        Tensor::from_data(out)
    }

    // --- Elementwise functions ---

    /// Element-wise square root.
    pub fn sqrt(&self) -> Tensor {
        Tensor::from_data(self.data().mapv(f32::sqrt))
    }

    /// GELU activation, tanh approximation:
    /// `0.5 x (1 + tanh(sqrt(2/pi) (x + 0.044715 x^3)))`.
    pub fn gelu(&self) -> Tensor {
        const SQRT_2_OVER_PI: f32 = 0.797_884_6;
        Tensor::from_data(self.data().mapv(|x| {
            0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + 0.044715 * x * x * x)).tanh())
        }))
    }

    /// Numerically stable softmax over an axis: the per-row maximum is
    /// subtracted before exponentiating, so rows with large magnitudes do not
    /// overflow to `inf / inf`.
    pub fn softmax(&self, axis: usize) -> Tensor {
        let ax = Axis(axis);
        let data = self.data();
        let max = data
            .map_axis(ax, |row| {
                row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
            })
            .insert_axis(ax);
        let exp = (&*data - &max).mapv(f32::exp);
        let sum = exp.sum_axis(ax).insert_axis(ax);
        Tensor::from_data(&exp / &sum)
    }

    // --- Matrix multiplication ---

    /// Performs matrix multiplication.
    ///
    /// Supported shapes, matching what the forward graph needs:
    /// - `(m, k) x (k, n)` plain 2D
    /// - `(b, m, k) x (b, k, n)` batched, used by attention with the batch and
    ///   head axes flattened together
    /// - `(b, m, k) x (k, n)` a shared projection applied across a batch
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        let self_shape = self.shape();
        let other_shape = other.shape();

        let out = if self_shape.len() == 2 && other_shape.len() == 2 {
            let a = self.data().clone().into_dimensionality::<Ix2>().unwrap();
            let b = other.data().clone().into_dimensionality::<Ix2>().unwrap();
            a.dot(&b).into_dyn()
        } else if self_shape.len() == 3 && other_shape.len() == 3 {
            let batch_size = self_shape[0];
            if batch_size != other_shape[0] {
                panic!(
                    "Batch dimensions must be equal for batched matmul: {:?} and {:?}",
                    self_shape, other_shape
                );
            }
            if self_shape[2] != other_shape[1] {
                panic!(
                    "Incompatible dimensions for batched matmul: {:?} and {:?}",
                    self_shape, other_shape
                );
            }
            let a = self.data().clone().into_dimensionality::<Ix3>().unwrap();
            let b = other.data().clone().into_dimensionality::<Ix3>().unwrap();
            let mut slices = Vec::with_capacity(batch_size);
            for i in 0..batch_size {
                slices.push(a.slice(s![i, .., ..]).dot(&b.slice(s![i, .., ..])));
            }
            let views: Vec<_> = slices.iter().map(|m| m.view()).collect();
            ndarray::stack(Axis(0), &views).unwrap().into_dyn()
        } else if self_shape.len() == 3 && other_shape.len() == 2 {
            let (batch_size, m, k) = (self_shape[0], self_shape[1], self_shape[2]);
            let n = other_shape[1];
            if k != other_shape[0] {
                panic!(
                    "Incompatible dimensions for 3D x 2D matmul: {:?} and {:?}",
                    self_shape, other_shape
                );
            }
            let a = self
                .data()
                .as_standard_layout()
                .into_owned()
                .into_shape((batch_size * m, k))
                .unwrap();
            let b = other.data().clone().into_dimensionality::<Ix2>().unwrap();
            a.dot(&b).into_shape((batch_size, m, n)).unwrap().into_dyn()
        } else {
            panic!(
                "Matmul not implemented for shapes {:?} and {:?}",
                self_shape, other_shape
            );
        };

        Tensor::from_data(out)
    }
}

// --- Operator overloads ---
// Elementwise ops lean on ndarray's broadcasting: the right operand is
// broadcast to the left operand's shape, which covers the `(B,T,D) + (1,T,D)`
// positional add and the `(B,T,D) * (D,)` layer-norm affine.

impl Add for &Tensor {
    type Output = Tensor;
    fn add(self, rhs: &Tensor) -> Tensor {
        Tensor::from_data(&*self.data() + &*rhs.data())
    }
}
impl<'a> Add<&'a Tensor> for Tensor {
    type Output = Tensor;
    fn add(self, rhs: &'a Tensor) -> Tensor {
        &self + rhs
    }
}
impl Add<f32> for &Tensor {
    type Output = Tensor;
    fn add(self, rhs: f32) -> Tensor {
        Tensor::from_data(&*self.data() + rhs)
    }
}
impl Add<f32> for Tensor {
    type Output = Tensor;
    fn add(self, rhs: f32) -> Tensor {
        &self + rhs
    }
}

impl Sub for &Tensor {
    type Output = Tensor;
    fn sub(self, rhs: &Tensor) -> Tensor {
        Tensor::from_data(&*self.data() - &*rhs.data())
    }
}
impl<'a> Sub<&'a Tensor> for Tensor {
    type Output = Tensor;
    fn sub(self, rhs: &'a Tensor) -> Tensor {
        &self - rhs
    }
}

impl Mul for &Tensor {
    type Output = Tensor;
    fn mul(self, rhs: &Tensor) -> Tensor {
        Tensor::from_data(&*self.data() * &*rhs.data())
    }
}
impl<'a> Mul<&'a Tensor> for Tensor {
    type Output = Tensor;
    fn mul(self, rhs: &'a Tensor) -> Tensor {
        &self * rhs
    }
}
impl Mul<f32> for &Tensor {
    type Output = Tensor;
    fn mul(self, rhs: f32) -> Tensor {
        Tensor::from_data(&*self.data() * rhs)
    }
}
impl Mul<f32> for Tensor {
    type Output = Tensor;
    fn mul(self, rhs: f32) -> Tensor {
        &self * rhs
    }
}

impl Div for &Tensor {
    type Output = Tensor;
    fn div(self, rhs: &Tensor) -> Tensor {
        Tensor::from_data(&*self.data() / &*rhs.data())
    }
}
impl<'a> Div<&'a Tensor> for Tensor {
    type Output = Tensor;
    fn div(self, rhs: &'a Tensor) -> Tensor {
        &self / rhs
    }
}
impl Div<f32> for &Tensor {
    type Output = Tensor;
    fn div(self, rhs: f32) -> Tensor {
        Tensor::from_data(&*self.data() / rhs)
    }
}
impl Div<f32> for Tensor {
    type Output = Tensor;
    fn div(self, rhs: f32) -> Tensor {
        &self / rhs
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(shape: {:?})\n{}", self.shape(), self.data())
    }
}
