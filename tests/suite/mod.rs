mod cli;
mod explore;
