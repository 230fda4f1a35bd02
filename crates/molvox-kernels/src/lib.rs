pub const KERNELS_SRC: &str = concat!(
    include_str!("kernels/density.cu"),
    include_str!("kernels/gradients.cu"),
);
