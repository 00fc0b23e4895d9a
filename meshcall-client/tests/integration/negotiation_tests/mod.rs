mod test_negotiation_timeout;
mod test_offerer_flow;
mod test_rejected_description;
