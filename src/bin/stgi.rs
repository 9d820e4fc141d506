extern crate spineless;

use std::process;

use clap::Parser;
use spineless::driver::eval;
use spineless::driver::options::StgiCli;

pub fn main() {
    let cli = StgiCli::parse();
    process::exit(eval::execute(&cli));
}
