mod distractions;
mod sessions;
