mod recovery;
mod restart;
