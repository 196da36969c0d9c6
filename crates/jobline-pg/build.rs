fn main() {
    // Embedded by sqlx::migrate!; rebuild when the schema changes.
    println!("cargo:rerun-if-changed=migrations/");
}
