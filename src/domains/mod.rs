// Domain-Driven Organization
pub mod feed;   // Viewer-relative read assemblers
pub mod social; // Writes to the social graph
