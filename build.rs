use sundials_sys as s;

fn main() {
    // Exposed through `sundials_tutorials::sundials_version()`.
    println!("cargo:rustc-env=SUNDIALS_VERSION_MAJOR={}",
             s::SUNDIALS_VERSION_MAJOR);
    println!("cargo:rustc-env=SUNDIALS_VERSION_MINOR={}",
             s::SUNDIALS_VERSION_MINOR);
}
