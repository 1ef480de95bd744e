fn main() {
    thirdop_lib::run()
}
