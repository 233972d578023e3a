mod archive;
mod build;
mod builder;
mod publishing;
mod queue;
mod source;
