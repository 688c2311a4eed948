fn main() {
    jobqueue::app::startup::startup();
}
