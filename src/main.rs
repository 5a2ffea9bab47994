use hostbridge::{Bridge, HostValue, TypedArray};
use rand::Rng;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let bridge = Bridge::global();

    // - - - - Tensor round trip - - - -
    let tensor = bridge
        .call(
            "tensorFromFloat32Buffer",
            &[
                HostValue::bigint(1),
                TypedArray::from_slice(&[1.0f32]).into(),
            ],
        )
        .unwrap();
    println!("{:?}", bridge.call("dtype", &[tensor.clone()]).unwrap());
    println!("{:?}", bridge.call("bytesUsed", &[]).unwrap());

    let contig = bridge.call("asContiguousTensor", &[tensor.clone()]).unwrap();
    println!("{:?}", bridge.call("float32Buffer", &[contig.clone()]).unwrap());

    bridge.call("dispose", &[tensor]).unwrap();
    bridge.call("dispose", &[contig]).unwrap();
    println!("{:?}", bridge.call("bytesUsed", &[]).unwrap());

    // - - - - Strided layout - - - -
    // A transposed matrix has to be copied before its bytes can be viewed
    let mut rng = rand::rng();
    let values: Vec<f32> = (0..6).map(|_| rng.random::<f32>()).collect();
    let handle = bridge.tensor_from_buffer(6, &values).unwrap();
    let matrix = bridge.reshape(handle, &[2, 3]).unwrap();
    let transposed = bridge.transpose(matrix).unwrap();

    match bridge.float32_buffer(transposed) {
        Ok(_) => println!("transposed view unexpectedly aliased"),
        Err(err) => println!("{err}"),
    }

    let contiguous = bridge.as_contiguous(transposed).unwrap();
    let view = bridge.float32_buffer(contiguous).unwrap();
    println!(
        "shape {:?}: {:?}",
        bridge.shape(contiguous).unwrap(),
        view.to_vec::<f32>().unwrap()
    );
    println!("bytes used: {}", bridge.bytes_used());

    for handle in [handle, matrix, transposed, contiguous] {
        bridge.dispose(handle).unwrap();
    }
    println!("bytes used after dispose: {}", bridge.bytes_used());

    // Reading a view after its handle is gone fails instead of touching freed memory
    println!("{}", view.to_vec::<f32>().unwrap_err());
}
