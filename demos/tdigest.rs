use tdigest_core::TDigest;

fn main() {
    let mut digest = TDigest::new();
    digest.update(1.0).unwrap();
    digest.update(2.0).unwrap();
    digest.update(3.0).unwrap();
    println!("{}", digest.quantile(0.5).unwrap());
}
