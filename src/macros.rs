/// Export a unit under a name, so that other units can `import` it.
///
/// ```ignore
/// fn string_tests(chain: &mut minicut::Chain) {
///     chain.suite("strings").test("concat", concat);
/// }
///
/// minicut::export!("strings", string_tests);
/// ```
#[macro_export]
macro_rules! export {
    ($name:expr, $unit:path) => {
        $crate::inventory::submit! {
            $crate::registry::ExportedUnit::new($name, $unit)
        }
    };
}

/// Expand to a `main` function running the tests registered by `unit`.
#[macro_export]
macro_rules! main {
    ($unit:path) => {
        fn main() -> ::std::process::ExitCode {
            $crate::cli::main($unit)
        }
    };
}
